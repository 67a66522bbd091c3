//! Client configuration
//!
//! Base URL plus the identity attached to every request: an authenticated
//! user id, an opaque share token for public access, or nothing.

use serde::{Deserialize, Serialize};

/// Default service address, overridable via `CAIRN_API_URL`
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Who the request is made as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// Unauthenticated; only public routes are reachable
    Anonymous,
    /// Authenticated user id, attached as the `X-User-Id` header
    User(String),
    /// Opaque share token addressing one published chatbot
    ShareToken(String),
}

/// Configuration for [`crate::stores::ApiClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub identity: Identity,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            identity: Identity::Anonymous,
        }
    }

    /// Base URL from `CAIRN_API_URL`, falling back to the default
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CAIRN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.identity = Identity::User(user_id.into());
        self
    }

    pub fn with_share_token(mut self, token: impl Into<String>) -> Self {
        self.identity = Identity::ShareToken(token.into());
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
