//! Updates fanned out to the render sink
//!
//! Every fragment produces a freshly derived snapshot; the sink replaces its
//! view of the assistant message rather than patching it.

use serde::{Deserialize, Serialize};

use crate::protocol::DecodeResult;

/// Updates emitted while a chat stream is consumed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatUpdate {
    /// Partial result after a fragment
    #[serde(rename = "snapshot")]
    Snapshot { result: DecodeResult },

    /// Final result; emitted exactly once, on stream termination
    #[serde(rename = "complete")]
    Complete { result: DecodeResult },

    /// Terminal failure, already phrased for display
    #[serde(rename = "error")]
    Error { message: String },
}
