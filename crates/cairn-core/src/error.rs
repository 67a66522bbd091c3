//! Error types for client operations
//!
//! Decode-level anomalies (unparseable citation tails, post-completion
//! fragments) are not errors; the decoder recovers from them silently.
//! This taxonomy covers the failures a caller must render or handle.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Failures surfaced to callers of the client
#[derive(Error, Debug)]
pub enum ChatError {
    /// The request never completed. Callers render a single generic
    /// apology message; no automatic retry.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success response with server-provided detail text
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// Client misconfiguration (bad base URL, missing identity)
    #[error("configuration error: {0}")]
    Config(String),

    /// A response body that should be JSON was not
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ChatError {
    /// True for transport-level failures (the apology path)
    pub fn is_network(&self) -> bool {
        matches!(self, ChatError::Network(_))
    }

    /// Message to show in place of the assistant reply
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Network(_) => {
                "Sorry, something went wrong. Please try again.".to_string()
            }
            ChatError::Server { detail, .. } => format!("Error: {detail}"),
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_carries_detail() {
        let err = ChatError::Server {
            status: 400,
            detail: "Chatbot LLM not configured".to_string(),
        };
        assert_eq!(err.user_message(), "Error: Chatbot LLM not configured");
        assert!(!err.is_network());
    }
}
