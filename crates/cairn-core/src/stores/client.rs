//! Shared HTTP plumbing for the store clients
//!
//! Builds identity-carrying requests against one base URL and maps
//! non-success responses to the server-error taxonomy.

use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, Identity};
use crate::error::{ChatError, Result};

/// Header carrying the authenticated user id
const USER_ID_HEADER: &str = "X-User-Id";

/// HTTP client bound to one service instance and one identity
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    identity: Identity,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|err| ChatError::Config(format!("invalid base URL: {err}")))?;
        Ok(Self {
            base_url,
            identity: config.identity,
            http: reqwest::Client::new(),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a request for `path`, attaching the identity header
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| ChatError::Config(format!("invalid path {path}: {err}")))?;
        debug!(%method, %url, "store request");
        let mut builder = self.http.request(method, url);
        if let Identity::User(user_id) = &self.identity {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        Ok(builder)
    }

    /// Map a non-success response to [`ChatError::Server`]
    ///
    /// The service reports failures as `{"detail": "..."}`; fall back to the
    /// raw body, then the status line, when that shape is missing.
    pub async fn handle_error_response(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
        Err(ChatError::Server {
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = ApiClient::new(ClientConfig::new("not a url"));
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[test]
    fn test_joins_paths_against_base() {
        let client = ApiClient::new(ClientConfig::new("http://localhost:8000")).unwrap();
        assert!(client.request(Method::GET, "/api/documents").is_ok());
    }
}
