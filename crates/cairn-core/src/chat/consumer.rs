//! Stream consumption and request supersession
//!
//! Drives one response byte stream through the decoder, emitting a
//! recomputed snapshot per fragment. A request token issued by
//! [`RequestTracker`] travels with the consumer; once a newer request
//! begins, updates from the stale stream are dropped (last-request-wins)
//! and its transport is cancelled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::updates::ChatUpdate;
use crate::error::{ChatError, Result};
use crate::protocol::{DecodeResult, StreamDecoder};

/// Identity of one user-initiated request
///
/// Explicit state passed into the consumer and checked there, never ambient:
/// multiple conversation surfaces can each hold their own tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Issues request tokens; only the latest one is current
#[derive(Debug, Default)]
pub struct RequestTracker {
    current: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding any prior one
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}

/// Cancels the superseded request's transport when a new one begins
///
/// Wrapper around [`CancellationToken`], swapped per request.
#[derive(Debug, Default)]
pub struct StreamCancellation {
    token: Mutex<CancellationToken>,
}

impl StreamCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the prior transport and hand out a token for the new one
    pub fn reset(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        guard.cancel();
        *guard = fresh.clone();
        fresh
    }

    /// Cancel the current transport without starting a new request
    pub fn cancel(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

/// How a consumed stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// Stream terminated normally; the result is final
    Complete(DecodeResult),
    /// A newer request superseded this one; nothing was emitted after that
    Superseded,
}

// Chunks arrive as raw bytes and may split multi-byte characters; hold the
// incomplete tail until the rest arrives.
#[derive(Debug, Default)]
struct Utf8Assembler {
    pending: Vec<u8>,
}

impl Utf8Assembler {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            Err(err) if err.error_len().is_some() => {
                // Genuinely invalid sequence, not a split boundary
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
            Err(err) => {
                let valid = err.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
        }
    }

    // A stream truncated mid-character leaves a held-back tail
    fn flush(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Consume a response byte stream into decode snapshots
///
/// Emits [`ChatUpdate::Snapshot`] per fragment and [`ChatUpdate::Complete`]
/// on termination, all gated on `token` still being current. The error
/// update carries the display message for the taxonomy in
/// [`crate::error::ChatError`].
pub async fn consume_stream<S>(
    mut stream: S,
    token: RequestToken,
    tracker: &RequestTracker,
    cancel: CancellationToken,
    tx: &mpsc::UnboundedSender<ChatUpdate>,
) -> Result<StreamOutcome>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    let mut decoder = StreamDecoder::new();
    let mut assembler = Utf8Assembler::default();
    let started = Instant::now();
    let mut fragments = 0usize;
    let mut bytes_received = 0usize;

    info!(request = token.id(), "consuming chat stream");

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                info!(request = token.id(), "stream transport cancelled");
                return Ok(StreamOutcome::Superseded);
            }
            next = stream.next() => next,
        };

        let Some(chunk) = next else {
            break;
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                let err = ChatError::from(err);
                if tracker.is_current(token) {
                    let _ = tx.send(ChatUpdate::Error {
                        message: err.user_message(),
                    });
                }
                return Err(err);
            }
        };

        if !tracker.is_current(token) {
            info!(request = token.id(), fragments, "request superseded mid-stream");
            return Ok(StreamOutcome::Superseded);
        }

        fragments += 1;
        bytes_received += chunk.len();
        let text = assembler.push(&chunk);
        let result = decoder.push(&text);
        debug!(
            request = token.id(),
            fragments,
            bytes_received,
            answer_len = result.answer_text.len(),
            "fragment decoded"
        );
        let _ = tx.send(ChatUpdate::Snapshot { result });
    }

    if !tracker.is_current(token) {
        info!(request = token.id(), "request superseded at end of stream");
        return Ok(StreamOutcome::Superseded);
    }

    let tail = assembler.flush();
    if !tail.is_empty() {
        decoder.push(&tail);
    }
    let result = decoder.finish();
    info!(
        request = token.id(),
        fragments,
        bytes_received,
        elapsed_ms = started.elapsed().as_millis() as u64,
        sources = result.sources.len(),
        session = result.session_handle.is_some(),
        "chat stream complete"
    );
    let _ = tx.send(ChatUpdate::Complete {
        result: result.clone(),
    });
    Ok(StreamOutcome::Complete(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&str]) -> Vec<std::result::Result<Bytes, reqwest::Error>> {
        parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect()
    }

    #[tokio::test]
    async fn test_consume_emits_snapshots_then_complete() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let source = stream::iter(chunks(&["Hello", " world__SOURCES__[]"]));
        let outcome = consume_stream(source, token, &tracker, CancellationToken::new(), &tx)
            .await
            .unwrap();

        let StreamOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(result.answer_text, "Hello world");
        assert!(result.complete);

        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[0], ChatUpdate::Snapshot { .. }));
        assert!(matches!(updates[2], ChatUpdate::Complete { .. }));
    }

    #[tokio::test]
    async fn test_superseded_stream_emits_nothing_further() {
        // Scenario C: a newer request begins while the first stream is
        // still arriving; the stale stream must not reach the sink.
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        let _second = tracker.begin();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let source = stream::iter(chunks(&["stale answer", "__SOURCES__[]"]));
        let outcome = consume_stream(source, first, &tracker, CancellationToken::new(), &tx)
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Superseded);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_transport_stops_consuming() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        let (tx, _rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let source = stream::pending::<std::result::Result<Bytes, reqwest::Error>>();
        let outcome = consume_stream(Box::pin(source), token, &tracker, cancel, &tx)
            .await
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Superseded);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let tracker = RequestTracker::new();
        let token = tracker.begin();
        let (tx, _rx) = mpsc::unbounded_channel();

        let text = "héllo__SOURCES__[]";
        let bytes = text.as_bytes();
        // Split inside the two-byte 'é'
        let source = stream::iter(vec![
            Ok(Bytes::copy_from_slice(&bytes[..2])),
            Ok(Bytes::copy_from_slice(&bytes[2..])),
        ]);
        let outcome = consume_stream(source, token, &tracker, CancellationToken::new(), &tx)
            .await
            .unwrap();
        let StreamOutcome::Complete(result) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(result.answer_text, "héllo");
    }

    #[test]
    fn test_tracker_last_request_wins() {
        let tracker = RequestTracker::new();
        let first = tracker.begin();
        assert!(tracker.is_current(first));
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn test_utf8_assembler_carries_tail() {
        let mut assembler = Utf8Assembler::default();
        let euro = "€".as_bytes();
        assert_eq!(assembler.push(&euro[..1]), "");
        assert_eq!(assembler.push(&euro[1..]), "€");
    }
}
