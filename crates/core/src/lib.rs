//! Shared building blocks for the QueryStream chat proxy: layered
//! configuration, the error taxonomy, chat domain types and the static
//! business knowledge catalogue.

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::chat::{validate_message, ChatMessage, ConversationContext, Sender};
pub use domain::knowledge::{DomainKnowledge, KnowledgeError, Package};
pub use errors::{ApplicationError, ClientInputError, InterfaceError, APOLOGY_MESSAGE};
