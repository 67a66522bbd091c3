//! Session Store client
//!
//! List, detail, rename, and delete prior conversation sessions. The
//! optimistic local bookkeeping lives in [`crate::session`]; this client is
//! the server-confirmed view.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::client::ApiClient;
use crate::error::Result;
use crate::session::{SessionMessage, SessionRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionRecord>,
    pub total: usize,
}

/// A session with its ordered messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub record: SessionRecord,
    pub messages: Vec<SessionMessage>,
}

impl ApiClient {
    /// Sessions for one chatbot, most recently updated first
    pub async fn list_sessions(&self, chatbot_id: Uuid) -> Result<SessionList> {
        let path = format!("/api/chatbots/{chatbot_id}/sessions");
        let response = self.request(Method::GET, &path)?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn get_session(&self, chatbot_id: Uuid, session_id: &str) -> Result<SessionDetail> {
        let path = format!("/api/chatbots/{chatbot_id}/sessions/{session_id}");
        let response = self.request(Method::GET, &path)?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn rename_session(
        &self,
        chatbot_id: Uuid,
        session_id: &str,
        title: &str,
    ) -> Result<SessionRecord> {
        let path = format!("/api/chatbots/{chatbot_id}/sessions/{session_id}");
        let response = self
            .request(Method::PATCH, &path)?
            .json(&json!({ "title": title }))
            .send()
            .await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_session(&self, chatbot_id: Uuid, session_id: &str) -> Result<()> {
        let path = format!("/api/chatbots/{chatbot_id}/sessions/{session_id}");
        let response = self.request(Method::DELETE, &path)?.send().await?;
        self.handle_error_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_detail_flattens_record() {
        let json = r#"{
            "id": "sess-42",
            "title": "What is the capital of France?",
            "created_at": "2026-08-01T10:30:00Z",
            "updated_at": "2026-08-01T10:31:00Z",
            "message_count": 2,
            "messages": [
                {"role": "user", "content": "What is the capital of France?"},
                {"role": "assistant", "content": "Paris.", "sources": []}
            ]
        }"#;
        let detail: SessionDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.record.id, "sess-42");
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].role, "user");
    }
}
