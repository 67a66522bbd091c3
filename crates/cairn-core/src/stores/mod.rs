//! Typed HTTP clients for the collaborating stores
//!
//! The Document Store, Chatbot Configuration Store, and Session Store are
//! external services; these modules are thin typed clients over one shared
//! [`ApiClient`].

pub mod chatbots;
pub mod client;
pub mod documents;
pub mod sessions;

pub use chatbots::{ChatbotConfig, ChatbotCreate, ChatbotList, ChatbotUpdate, PublicChatbotInfo};
pub use client::ApiClient;
pub use documents::{Document, DocumentList};
pub use sessions::{SessionDetail, SessionList};
