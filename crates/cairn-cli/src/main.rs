//! Cairn terminal client
//!
//! Streams chat replies from a Cairn service into the terminal and offers
//! small listings over the collaborating stores.

mod repl;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use cairn_core::config::DEFAULT_API_URL;
use cairn_core::{ApiClient, ChatClient, ClientConfig, SessionContinuity};

#[derive(Parser)]
#[command(name = "cairn", version, about = "Chat with document-grounded chatbots")]
struct Cli {
    /// Service base URL
    #[arg(long, env = "CAIRN_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Authenticated user id (sent as X-User-Id)
    #[arg(long, env = "CAIRN_USER_ID")]
    user: Option<String>,

    /// Share token for a published chatbot (public access)
    #[arg(long, conflicts_with = "user")]
    share_token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat with a chatbot (default)
    Chat {
        /// Chatbot to talk to; not needed with a share token
        #[arg(long)]
        chatbot: Option<Uuid>,
        /// Session to resume
        #[arg(long)]
        session: Option<String>,
    },
    /// List uploaded documents
    Documents,
    /// List chatbots
    Chatbots,
    /// List sessions for a chatbot
    Sessions {
        #[arg(long)]
        chatbot: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(cli.api_url.clone());
    if let Some(user) = &cli.user {
        config = config.with_user(user.clone());
    } else if let Some(token) = &cli.share_token {
        config = config.with_share_token(token.clone());
    }

    match cli.command.unwrap_or(Command::Chat {
        chatbot: None,
        session: None,
    }) {
        Command::Chat { chatbot, session } => {
            let target = match (chatbot, &cli.share_token) {
                (Some(id), None) => repl::ChatTarget::Owned(id),
                (None, Some(_)) => repl::ChatTarget::Public,
                (Some(_), Some(_)) => bail!("--chatbot and --share-token are exclusive"),
                (None, None) => bail!("pass --chatbot <id> or --share-token <token>"),
            };

            let client = ChatClient::new(config)?;
            let mut continuity = SessionContinuity::new();
            if let Some(session_id) = session {
                resume_session(client.api(), &target, &session_id, &mut continuity).await?;
            }
            repl::run(client, target, continuity).await
        }
        Command::Documents => {
            let api = ApiClient::new(config)?;
            let list = api.list_documents().await?;
            for document in &list.documents {
                println!(
                    "{}  {:>9}  {:<12} {}",
                    document.id, document.file_size, document.status, document.original_filename
                );
            }
            println!("{} document(s)", list.total);
            Ok(())
        }
        Command::Chatbots => {
            let api = ApiClient::new(config)?;
            let list = api.list_chatbots().await?;
            for chatbot in &list.chatbots {
                let model = chatbot.llm_model.as_deref().unwrap_or("-");
                let public = if chatbot.is_published() { "public" } else { "private" };
                println!(
                    "{}  {:<8} {:<24} {} ({} docs)",
                    chatbot.id, public, model, chatbot.name, chatbot.document_count
                );
            }
            println!("{} chatbot(s)", list.total);
            Ok(())
        }
        Command::Sessions { chatbot } => {
            let api = ApiClient::new(config)?;
            let list = api.list_sessions(chatbot).await?;
            for session in &list.sessions {
                println!(
                    "{}  {:>3} msgs  {}  {}",
                    session.id,
                    session.message_count,
                    session.updated_at.format("%Y-%m-%d %H:%M"),
                    session.title
                );
            }
            println!("{} session(s)", list.total);
            Ok(())
        }
    }
}

/// Load a stored session so continuity picks up where it left off
async fn resume_session(
    api: &ApiClient,
    target: &repl::ChatTarget,
    session_id: &str,
    continuity: &mut SessionContinuity,
) -> Result<()> {
    if let repl::ChatTarget::Owned(chatbot_id) = target {
        let detail = api.get_session(*chatbot_id, session_id).await?;
        println!("resuming \"{}\" ({} messages)", detail.record.title, detail.record.message_count);
        continuity.activate(detail.record);
    } else {
        // Public surfaces have no session listing; trust the handle as-is
        let now = chrono::Utc::now();
        continuity.activate(cairn_core::SessionRecord {
            id: session_id.to_string(),
            title: String::new(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        });
    }
    Ok(())
}
