//! Incremental decoder for the multiplexed chat stream
//!
//! Accumulates fragments and rescans the entire buffer on every push, so a
//! marker or JSON payload split across fragment boundaries resolves by
//! itself: the same final result is produced regardless of how the bytes
//! were chunked. Answer sizes are tens of KB, so the repeated scan is cheap.
//! Do not replace the rescan with a saved cursor — boundary invariance
//! depends on it.

use tracing::{debug, warn};

use super::channels::{ChannelState, ChannelTracker};
use super::{DecodeResult, SourceCitation, SESSION_MARKER, SOURCES_MARKER};

/// Upper bound on accumulated answer text; overflow is dropped
const MAX_BUFFER_BYTES: usize = 1024 * 1024;

/// Incremental decoder for one request's stream
///
/// `push` may be called with arbitrarily sized fragments; `snapshot` is
/// idempotent between pushes. `finish` is the only path to a `complete`
/// result and must be driven by the stream source's terminal signal, never
/// inferred from buffer contents.
pub struct StreamDecoder {
    buffer: String,
    channels: ChannelTracker,
    /// Last citation set that parsed successfully
    last_sources: Vec<SourceCitation>,
    sources_parsed: bool,
    session_handle: Option<String>,
    complete: bool,
    dropped_bytes: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            channels: ChannelTracker::new(),
            last_sources: Vec::new(),
            sources_parsed: false,
            session_handle: None,
            complete: false,
            dropped_bytes: 0,
        }
    }

    /// Append a fragment and rescan
    ///
    /// Fragments delivered after the stream completed are a protocol
    /// violation and are ignored (counted and logged, never fatal).
    pub fn push(&mut self, fragment: &str) -> DecodeResult {
        if self.channels.is_done() {
            let ignored = self.channels.on_post_done_fragment();
            debug!(ignored, len = fragment.len(), "fragment after DONE ignored");
            return self.snapshot();
        }

        self.channels.on_fragment();
        self.append_bounded(fragment);
        self.rescan();
        self.snapshot()
    }

    /// Terminal signal from the stream source; sets `complete`
    pub fn finish(&mut self) -> DecodeResult {
        if !self.complete {
            self.complete = true;
            self.channels.on_done();
            if self.sources_malformed() {
                warn!(
                    segment_len = self.sources_segment().map(str::len).unwrap_or(0),
                    "stream ended with an unparseable citation segment"
                );
            }
        }
        self.snapshot()
    }

    /// Derive the current result from the accumulated buffer
    ///
    /// Recomputed, not diffed: calling this twice with no push in between
    /// returns identical results.
    pub fn snapshot(&self) -> DecodeResult {
        let answer_text = match self.buffer.find(SOURCES_MARKER) {
            Some(idx) => self.buffer[..idx].trim(),
            None => self.buffer.trim(),
        };
        DecodeResult {
            answer_text: answer_text.to_string(),
            sources: self.last_sources.clone(),
            session_handle: self.session_handle.clone(),
            complete: self.complete,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.channels.state()
    }

    /// True when the stream ended with a citation segment present but never
    /// successfully parsed. The result still carries the last good sources;
    /// callers may log the anomaly but must not surface it to the user.
    pub fn sources_malformed(&self) -> bool {
        self.channels.is_done()
            && !self.sources_parsed
            && self.sources_segment().is_some_and(|s| !s.trim().is_empty())
    }

    fn append_bounded(&mut self, fragment: &str) {
        let room = MAX_BUFFER_BYTES.saturating_sub(self.buffer.len());
        if fragment.len() <= room {
            self.buffer.push_str(fragment);
            return;
        }
        // Keep what fits, on a char boundary
        let mut take = room;
        while take > 0 && !fragment.is_char_boundary(take) {
            take -= 1;
        }
        self.buffer.push_str(&fragment[..take]);
        self.dropped_bytes += fragment.len() - take;
        warn!(
            dropped = self.dropped_bytes,
            "answer exceeded {} bytes, dropping overflow",
            MAX_BUFFER_BYTES
        );
    }

    // Locate markers by first literal occurrence and re-derive channel
    // payloads from the full buffer.
    fn rescan(&mut self) {
        let Some(idx) = self.buffer.find(SOURCES_MARKER) else {
            return;
        };
        self.channels.on_sources_located();

        let remainder = &self.buffer[idx + SOURCES_MARKER.len()..];
        let segment = match remainder.find(SESSION_MARKER) {
            Some(session_idx) => {
                self.channels.on_session_located();
                let handle = remainder[session_idx + SESSION_MARKER.len()..].trim();
                // An empty payload after the marker stays None
                self.session_handle = (!handle.is_empty()).then(|| handle.to_string());
                &remainder[..session_idx]
            }
            None => {
                self.session_handle = None;
                remainder
            }
        };

        let segment = segment.trim();
        if segment.is_empty() {
            return;
        }
        match serde_json::from_str::<Vec<SourceCitation>>(segment) {
            Ok(sources) => {
                self.last_sources = sources;
                self.sources_parsed = true;
            }
            Err(err) => {
                // Routinely hit while the JSON tail is still arriving;
                // previous good sources are retained.
                debug!(%err, "citation segment not parseable yet");
            }
        }
    }

    fn sources_segment(&self) -> Option<&str> {
        let idx = self.buffer.find(SOURCES_MARKER)?;
        let remainder = &self.buffer[idx + SOURCES_MARKER.len()..];
        Some(match remainder.find(SESSION_MARKER) {
            Some(session_idx) => &remainder[..session_idx],
            None => remainder,
        })
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}
