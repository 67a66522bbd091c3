//! Cairn core library
//!
//! Client-side machinery for a document-grounded chatbot service: the
//! incremental decoder for the multiplexed chat stream, channel discovery
//! tracking, request supersession, optimistic session continuity, and typed
//! clients for the collaborating stores.

pub mod chat;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod stores;

pub use chat::{
    consume_stream, ChatClient, ChatRequest, ChatResponse, ChatUpdate, RequestToken,
    RequestTracker, StreamOutcome,
};
pub use config::{ClientConfig, Identity};
pub use error::{ChatError, Result};
pub use protocol::{
    ChannelState, DecodeResult, SourceCitation, StreamDecoder, SESSION_MARKER, SOURCES_MARKER,
};
pub use session::{SessionContinuity, SessionMessage, SessionRecord};
pub use stores::ApiClient;
