//! Interactive chat loop
//!
//! One in-flight request at a time: the prompt does not return until the
//! stream settles, which is how a single terminal surface enforces the
//! no-parallel-requests rule. Every failure path falls through to the next
//! prompt.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use cairn_core::{
    ChatClient, ChatRequest, ChatUpdate, DecodeResult, SessionContinuity, StreamOutcome,
};

/// Which endpoint the conversation goes through
#[derive(Debug, Clone)]
pub enum ChatTarget {
    /// An owned chatbot, by id
    Owned(Uuid),
    /// The published chatbot behind the client's share token
    Public,
}

pub async fn run(client: ChatClient, target: ChatTarget, mut continuity: SessionContinuity) -> Result<()> {
    println!("cairn chat — empty line or Ctrl-D to quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim().to_string();
        if message.is_empty() {
            break;
        }
        send_message(&client, &target, &message, &mut continuity).await;
    }
    Ok(())
}

async fn send_message(
    client: &ChatClient,
    target: &ChatTarget,
    message: &str,
    continuity: &mut SessionContinuity,
) {
    let (token, cancel) = client.begin_request();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut request = ChatRequest::new(message);
    if let Some(session_id) = continuity.handle() {
        request = request.with_session(session_id);
    }

    let printer = tokio::spawn(print_updates(rx));

    let outcome = match target {
        ChatTarget::Owned(chatbot_id) => {
            client.stream_chat(*chatbot_id, &request, token, cancel, &tx).await
        }
        ChatTarget::Public => client.stream_public_chat(&request, token, cancel, &tx).await,
    };
    drop(tx);
    let error_rendered = printer.await.unwrap_or(false);

    match outcome {
        Ok(StreamOutcome::Complete(result)) => {
            render_citations(&result);
            if let Some(handle) = &result.session_handle {
                let record = continuity.reconcile(handle, message);
                println!("[session {} · {} messages]", record.id, record.message_count);
            }
        }
        Ok(StreamOutcome::Superseded) => {
            tracing::debug!("request superseded, result discarded");
        }
        Err(err) => {
            // Mid-stream failures already reached the sink as an error
            // update; only render the ones that happened before the stream.
            if !error_rendered {
                println!("{}", err.user_message());
            }
        }
    }
}

/// Render snapshots as they arrive, printing only the new suffix
///
/// Returns true when an error update was rendered.
async fn print_updates(mut rx: mpsc::UnboundedReceiver<ChatUpdate>) -> bool {
    let mut printed = String::new();
    let mut error_rendered = false;
    while let Some(update) = rx.recv().await {
        match update {
            ChatUpdate::Snapshot { result } => print_delta(&mut printed, &result.answer_text),
            ChatUpdate::Complete { result } => {
                if result.answer_text.starts_with(&printed) {
                    print_delta(&mut printed, &result.answer_text);
                } else {
                    // The settled answer diverged from what streamed (a
                    // half-printed marker); reprint it whole.
                    println!();
                    print!("{}", result.answer_text);
                }
                println!();
            }
            ChatUpdate::Error { message } => {
                if !printed.is_empty() {
                    println!();
                }
                println!("{message}");
                error_rendered = true;
            }
        }
    }
    error_rendered
}

fn print_delta(printed: &mut String, full: &str) {
    if full.starts_with(printed.as_str()) && full.len() > printed.len() {
        print!("{}", &full[printed.len()..]);
        let _ = std::io::stdout().flush();
        printed.clear();
        printed.push_str(full);
    }
}

fn render_citations(result: &DecodeResult) {
    if result.sources.is_empty() {
        return;
    }
    println!("---");
    for source in &result.sources {
        let page = source
            .page
            .map(|p| format!(" p.{p}"))
            .unwrap_or_default();
        println!("  [{:.2}] {}{}", source.score, source.filename, page);
    }
}
