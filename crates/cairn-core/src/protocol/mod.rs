//! Multiplexed chat stream protocol
//!
//! The answer endpoint replies with one continuous text stream carrying, in
//! order: the answer text, an optional citation channel, and an optional
//! session channel:
//!
//! ```text
//! <answer text>__SOURCES__<json citations>[__SESSION__<session id>]
//! ```
//!
//! Markers are fixed literals located by first occurrence, never pattern
//! matched. Fragment boundaries are arbitrary and may split markers or JSON.

pub mod channels;
pub mod decoder;

pub use channels::{ChannelState, ChannelTracker};
pub use decoder::StreamDecoder;

use serde::{Deserialize, Serialize};

/// Literal marker that opens the citation channel
pub const SOURCES_MARKER: &str = "__SOURCES__";

/// Literal marker that opens the session channel
pub const SESSION_MARKER: &str = "__SESSION__";

/// A retrieval citation attached to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    /// Excerpt of the retrieved chunk
    pub text: String,
    /// Relevance score, clamped to [0, 1] on deserialization.
    /// The server omits it for unscored nodes.
    #[serde(deserialize_with = "score_in_unit_range", default)]
    pub score: f64,
    /// Original filename the chunk came from
    pub filename: String,
    /// Owning document id
    pub document_id: String,
    /// Page number where the retriever knows it
    #[serde(default)]
    pub page: Option<i64>,
}

/// What the decoder has derived from the stream so far
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodeResult {
    /// Answer text accumulated so far (trimmed)
    pub answer_text: String,
    /// Last successfully parsed citation set
    pub sources: Vec<SourceCitation>,
    /// Server-issued session id, once the session channel has a payload
    pub session_handle: Option<String>,
    /// True exactly once per request, set only by stream termination
    pub complete: bool,
}

fn score_in_unit_range<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.unwrap_or(0.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_deserializes_wire_shape() {
        let json = r#"{"text":"France","score":0.9,"filename":"f.pdf","document_id":"d1","page":3}"#;
        let citation: SourceCitation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.text, "France");
        assert_eq!(citation.score, 0.9);
        assert_eq!(citation.page, Some(3));
    }

    #[test]
    fn test_citation_score_clamped() {
        let json = r#"{"text":"t","score":1.7,"filename":"f","document_id":"d","page":null}"#;
        let citation: SourceCitation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.score, 1.0);
    }

    #[test]
    fn test_citation_null_score_and_missing_page() {
        // Unscored nodes arrive with score: null and no page field
        let json = r#"{"text":"t","score":null,"filename":"f","document_id":"d"}"#;
        let citation: SourceCitation = serde_json::from_str(json).unwrap();
        assert_eq!(citation.score, 0.0);
        assert_eq!(citation.page, None);
    }
}
