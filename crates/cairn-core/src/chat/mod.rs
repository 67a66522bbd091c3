//! Chat requests against the answer-generation service
//!
//! Streaming calls feed the response body through the incremental decoder
//! (see [`crate::protocol`]); the non-streaming call returns the parsed
//! answer and citations in one shot.

pub mod consumer;
pub mod updates;

pub use consumer::{consume_stream, RequestToken, RequestTracker, StreamCancellation, StreamOutcome};
pub use updates::ChatUpdate;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::{ClientConfig, Identity};
use crate::error::{ChatError, Result};
use crate::protocol::SourceCitation;
use crate::stores::ApiClient;

/// Body of a chat request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Session to continue; omitted for a fresh conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Response of the non-streaming chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
}

/// Client for the chat endpoints of one service instance
///
/// Owns the request tracker and transport cancellation for its conversation
/// surface; callers start each request through [`ChatClient::begin_request`]
/// so that a newer request supersedes the stream of the prior one.
pub struct ChatClient {
    api: ApiClient,
    tracker: RequestTracker,
    cancellation: StreamCancellation,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            tracker: RequestTracker::new(),
            cancellation: StreamCancellation::new(),
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Begin a request: supersedes the prior one and cancels its transport
    pub fn begin_request(&self) -> (RequestToken, CancellationToken) {
        let token = self.tracker.begin();
        let cancel = self.cancellation.reset();
        info!(request = token.id(), "chat request started");
        (token, cancel)
    }

    /// Abort the in-flight request without starting a new one
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Stream a chat reply for an owned chatbot
    pub async fn stream_chat(
        &self,
        chatbot_id: Uuid,
        request: &ChatRequest,
        token: RequestToken,
        cancel: CancellationToken,
        tx: &mpsc::UnboundedSender<ChatUpdate>,
    ) -> Result<StreamOutcome> {
        let path = format!("/api/chat/{chatbot_id}/stream");
        self.stream_to(&path, request, token, cancel, tx).await
    }

    /// Stream a chat reply through the public share-token endpoint
    pub async fn stream_public_chat(
        &self,
        request: &ChatRequest,
        token: RequestToken,
        cancel: CancellationToken,
        tx: &mpsc::UnboundedSender<ChatUpdate>,
    ) -> Result<StreamOutcome> {
        let Identity::ShareToken(share_token) = self.api.identity() else {
            return Err(ChatError::Config(
                "public chat requires a share token identity".to_string(),
            ));
        };
        let path = format!("/api/public/{share_token}/chat");
        self.stream_to(&path, request, token, cancel, tx).await
    }

    /// Non-streaming chat; returns the full answer and citations at once
    pub async fn chat(&self, chatbot_id: Uuid, request: &ChatRequest) -> Result<ChatResponse> {
        let path = format!("/api/chat/{chatbot_id}");
        let response = self
            .api
            .request(Method::POST, &path)?
            .json(request)
            .send()
            .await?;
        let response = self.api.handle_error_response(response).await?;
        Ok(response.json().await?)
    }

    async fn stream_to(
        &self,
        path: &str,
        request: &ChatRequest,
        token: RequestToken,
        cancel: CancellationToken,
        tx: &mpsc::UnboundedSender<ChatUpdate>,
    ) -> Result<StreamOutcome> {
        let response = self
            .api
            .request(Method::POST, path)?
            .json(request)
            .send()
            .await?;
        let response = self.api.handle_error_response(response).await?;
        let stream = Box::pin(response.bytes_stream());
        consume_stream(stream, token, &self.tracker, cancel, tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_without_empty_session() {
        let request = ChatRequest::new("hi");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hi"}));

        let request = ChatRequest::new("hi").with_session("sess-1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": "hi", "session_id": "sess-1"})
        );
    }
}
