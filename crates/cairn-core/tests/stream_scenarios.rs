//! End-to-end stream scenarios through the consumer
//!
//! Feeds scripted byte streams (as the transport would deliver them) through
//! `consume_stream` and checks the settled results against the protocol
//! contract.

use bytes::Bytes;
use futures::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cairn_core::{consume_stream, ChatUpdate, DecodeResult, RequestTracker, StreamOutcome};

fn byte_chunks(parts: &[&[u8]]) -> Vec<Result<Bytes, reqwest::Error>> {
    parts
        .iter()
        .map(|part| Ok(Bytes::copy_from_slice(part)))
        .collect()
}

async fn run(parts: &[&[u8]]) -> (StreamOutcome, Vec<ChatUpdate>) {
    let tracker = RequestTracker::new();
    let token = tracker.begin();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let source = stream::iter(byte_chunks(parts));
    let outcome = consume_stream(source, token, &tracker, CancellationToken::new(), &tx)
        .await
        .expect("scripted stream cannot fail");
    drop(tx);
    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    (outcome, updates)
}

fn final_result(outcome: &StreamOutcome) -> &DecodeResult {
    match outcome {
        StreamOutcome::Complete(result) => result,
        StreamOutcome::Superseded => panic!("stream was superseded"),
    }
}

#[tokio::test]
async fn scenario_a_empty_sources() {
    let (outcome, _) = run(&[b"The sky is blue.__SOURCES__[]"]).await;
    let result = final_result(&outcome);
    assert_eq!(result.answer_text, "The sky is blue.");
    assert!(result.sources.is_empty());
    assert_eq!(result.session_handle, None);
    assert!(result.complete);
}

#[tokio::test]
async fn scenario_b_three_fragments_with_citation_and_session() {
    let (outcome, updates) = run(&[
        b"Paris is the capital",
        b" of France.__SOURCES__[{\"text\":\"France",
        b"\",\"score\":0.9,\"filename\":\"f.pdf\",\"document_id\":\"d1\",\"page\":3}]__SESSION__sess-42",
    ])
    .await;
    let result = final_result(&outcome);
    assert_eq!(result.answer_text, "Paris is the capital of France.");
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].text, "France");
    assert_eq!(result.sources[0].score, 0.9);
    assert_eq!(result.sources[0].filename, "f.pdf");
    assert_eq!(result.sources[0].document_id, "d1");
    assert_eq!(result.sources[0].page, Some(3));
    assert_eq!(result.session_handle, Some("sess-42".to_string()));

    // One snapshot per fragment, then the completion
    assert_eq!(updates.len(), 4);
    let ChatUpdate::Snapshot { result: first } = &updates[0] else {
        panic!("expected snapshot");
    };
    assert_eq!(first.answer_text, "Paris is the capital");
    assert!(!first.complete);
    assert!(matches!(updates[3], ChatUpdate::Complete { .. }));
}

#[tokio::test]
async fn scenario_c_superseded_request_stays_silent() {
    let tracker = RequestTracker::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // First request starts...
    let first = tracker.begin();
    // ...and a second one is issued before the first stream arrives.
    let second = tracker.begin();

    let stale = stream::iter(byte_chunks(&[b"first answer__SOURCES__[]"]));
    let outcome = consume_stream(stale, first, &tracker, CancellationToken::new(), &tx)
        .await
        .expect("scripted stream cannot fail");
    assert_eq!(outcome, StreamOutcome::Superseded);

    let live = stream::iter(byte_chunks(&[b"second answer__SOURCES__[]"]));
    let outcome = consume_stream(live, second, &tracker, CancellationToken::new(), &tx)
        .await
        .expect("scripted stream cannot fail");
    let result = final_result(&outcome);
    assert_eq!(result.answer_text, "second answer");

    // Only the second request's updates reached the sink
    drop(tx);
    while let Some(update) = rx.recv().await {
        let (ChatUpdate::Snapshot { result } | ChatUpdate::Complete { result }) = update else {
            panic!("unexpected error update");
        };
        assert_eq!(result.answer_text, "second answer");
    }
}

#[tokio::test]
async fn boundary_invariance_across_byte_splits() {
    let full: &[u8] = "R\u{e9}ponse: oui.__SOURCES__[{\"text\":\"d\u{e9}tail\",\"score\":1.0,\"filename\":\"n.md\",\"document_id\":\"d9\",\"page\":null}]__SESSION__sess-\u{3b2}"
        .as_bytes();

    let (whole, _) = run(&[full]).await;
    let expected = final_result(&whole).clone();

    // Every byte offset, including ones inside multi-byte characters and
    // inside the markers themselves
    for split in 0..=full.len() {
        let (outcome, _) = run(&[&full[..split], &full[split..]]).await;
        assert_eq!(
            final_result(&outcome),
            &expected,
            "split at byte {split} changed the result"
        );
    }
}

#[tokio::test]
async fn truncated_citation_tail_never_clears_parsed_sources() {
    // The tail after the first complete citation array keeps growing; each
    // intermediate state must retain the last good parse.
    let (outcome, updates) = run(&[
        b"ok__SOURCES__[{\"text\":\"a\",\"score\":0.2,\"filename\":\"a\",\"document_id\":\"d\",\"page\":null}]",
        b"__SESSION__se",
        b"ss-9",
    ])
    .await;
    let result = final_result(&outcome);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.session_handle, Some("sess-9".to_string()));

    for update in &updates {
        if let ChatUpdate::Snapshot { result } | ChatUpdate::Complete { result } = update {
            // Once parsed, never un-parsed
            if !result.answer_text.is_empty() {
                assert!(result.sources.len() <= 1);
            }
        }
    }
}
