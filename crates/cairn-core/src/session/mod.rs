//! Session continuity
//!
//! Reconciles a decoded session handle against local session bookkeeping.
//! The server issues handles; this module only reacts to them, applying
//! optimistic updates so the session list is usable before the next
//! server-confirmed listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest synthesized title, in characters
const TITLE_MAX_CHARS: usize = 60;

/// A conversation session as the Session Store reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Server-issued handle
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// One message inside a session detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<crate::protocol::SourceCitation>,
}

/// Tracks the active session for one conversation surface
///
/// Shared by every surface that talks to the chat endpoint; the optimistic
/// record fabrication lives here and nowhere else.
#[derive(Debug, Default)]
pub struct SessionContinuity {
    active: Option<SessionRecord>,
}

impl SessionContinuity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session the caller selected from the store
    pub fn activate(&mut self, record: SessionRecord) {
        self.active = Some(record);
    }

    /// Drop the active session (caller started a fresh conversation)
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&SessionRecord> {
        self.active.as_ref()
    }

    /// Handle to send with the next request, if a session is active
    pub fn handle(&self) -> Option<&str> {
        self.active.as_ref().map(|record| record.id.as_str())
    }

    /// Reconcile a handle decoded from a completed stream
    ///
    /// Called once per request, on stream completion. With no active
    /// session, a record is fabricated from the user's message and marked
    /// active immediately; with one, its bookkeeping is bumped. A user/
    /// assistant exchange counts two messages either way.
    pub fn reconcile(&mut self, handle: &str, user_message: &str) -> &SessionRecord {
        let now = Utc::now();
        let record = match self.active.take() {
            Some(mut record) => {
                record.updated_at = now;
                record.message_count += 2;
                debug!(
                    session = %record.id,
                    messages = record.message_count,
                    "session bookkeeping updated"
                );
                record
            }
            None => {
                let record = SessionRecord {
                    id: handle.to_string(),
                    title: synthesize_title(user_message),
                    created_at: now,
                    updated_at: now,
                    message_count: 2,
                };
                debug!(session = %record.id, title = %record.title, "session synthesized");
                record
            }
        };
        self.active.insert(record)
    }
}

/// First 60 characters of the message, ellipsized if truncated
fn synthesize_title(user_message: &str) -> String {
    let trimmed = user_message.trim();
    let mut chars = trimmed.char_indices();
    match chars.nth(TITLE_MAX_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
