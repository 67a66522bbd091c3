//! Chatbot Configuration Store client
//!
//! CRUD over chatbot configurations: name, description, branding, LLM
//! provider/model/key, enabled document set, memory toggle, publication.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::client::ApiClient;
use crate::error::Result;

/// A chatbot configuration as the store reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotConfig {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    /// The store keeps this flag stringly ("true"/"false")
    pub is_public: String,
    pub public_token: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub document_count: usize,
    #[serde(default)]
    pub document_ids: Vec<Uuid>,
    #[serde(default)]
    pub accent_primary: Option<String>,
    #[serde(default)]
    pub accent_secondary: Option<String>,
    #[serde(default)]
    pub has_avatar: bool,
    #[serde(default)]
    pub memory_enabled: bool,
}

impl ChatbotConfig {
    pub fn is_published(&self) -> bool {
        self.is_public == "true"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotList {
    pub chatbots: Vec<ChatbotConfig>,
    pub total: usize,
}

/// Payload for creating a chatbot
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatbotCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub document_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatbotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<String>,
}

/// What the public chat page needs to render a published chatbot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicChatbotInfo {
    pub name: String,
    pub description: Option<String>,
    pub accent_primary: String,
    pub accent_secondary: String,
    pub avatar_url: Option<String>,
    pub has_avatar: bool,
}

impl ApiClient {
    pub async fn create_chatbot(&self, payload: &ChatbotCreate) -> Result<ChatbotConfig> {
        let response = self
            .request(Method::POST, "/api/chatbots")?
            .json(payload)
            .send()
            .await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_chatbots(&self) -> Result<ChatbotList> {
        let response = self.request(Method::GET, "/api/chatbots")?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn get_chatbot(&self, chatbot_id: Uuid) -> Result<ChatbotConfig> {
        let path = format!("/api/chatbots/{chatbot_id}");
        let response = self.request(Method::GET, &path)?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn update_chatbot(
        &self,
        chatbot_id: Uuid,
        payload: &ChatbotUpdate,
    ) -> Result<ChatbotConfig> {
        let path = format!("/api/chatbots/{chatbot_id}");
        let response = self
            .request(Method::PATCH, &path)?
            .json(payload)
            .send()
            .await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_chatbot(&self, chatbot_id: Uuid) -> Result<()> {
        let path = format!("/api/chatbots/{chatbot_id}");
        let response = self.request(Method::DELETE, &path)?.send().await?;
        self.handle_error_response(response).await?;
        Ok(())
    }

    /// Publish or unpublish; publication issues the share token server-side
    pub async fn set_published(&self, chatbot_id: Uuid, published: bool) -> Result<ChatbotConfig> {
        let payload = ChatbotUpdate {
            is_public: Some(if published { "true" } else { "false" }.to_string()),
            ..ChatbotUpdate::default()
        };
        self.update_chatbot(chatbot_id, &payload).await
    }

    /// Info for a published chatbot, addressed by share token (no identity)
    pub async fn public_chatbot_info(&self, share_token: &str) -> Result<PublicChatbotInfo> {
        let path = format!("/api/public/{share_token}");
        let response = self.request(Method::GET, &path)?.send().await?;
        let response = self.handle_error_response(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_serializes_only_set_fields() {
        let payload = ChatbotUpdate {
            name: Some("Support Bot".to_string()),
            ..ChatbotUpdate::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Support Bot"}));
    }

    #[test]
    fn test_config_publication_flag() {
        let json = r#"{
            "id": "8c7f9a8e-2c1d-4f6a-9b2e-000000000002",
            "name": "Docs Bot",
            "description": null,
            "llm_provider": "anthropic",
            "llm_model": "claude-sonnet-4-5",
            "is_public": "true",
            "public_token": "tok123",
            "created_at": "2026-08-01T10:30:00Z",
            "document_count": 3
        }"#;
        let config: ChatbotConfig = serde_json::from_str(json).unwrap();
        assert!(config.is_published());
        assert_eq!(config.document_count, 3);
        assert!(config.document_ids.is_empty());
    }
}
