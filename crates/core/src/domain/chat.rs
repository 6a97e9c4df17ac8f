use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ClientInputError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Speaker label used in prompt transcripts. Matches the stop sequences
    /// handed to the generation API.
    pub fn transcript_label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Bot => "Assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self { sender, text: text.into(), timestamp: Utc::now() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }
}

/// Prior turns of one chat session, oldest first. Owned by the caller and
/// resent on every request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationContext(Vec<ChatMessage>);

impl ConversationContext {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }
}

impl From<Vec<ChatMessage>> for ConversationContext {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self(messages)
    }
}

/// Checks an inbound message against the boundary rules before any routing
/// happens. Whitespace-only text counts as blank. Length is counted in
/// characters, not bytes.
pub fn validate_message(
    message: Option<&str>,
    max_chars: usize,
) -> Result<&str, ClientInputError> {
    let message = message.ok_or(ClientInputError::MissingMessage)?;
    if message.trim().is_empty() {
        return Err(ClientInputError::BlankMessage);
    }

    let actual = message.chars().count();
    if actual > max_chars {
        return Err(ClientInputError::MessageTooLong { limit: max_chars, actual });
    }

    Ok(message)
}
