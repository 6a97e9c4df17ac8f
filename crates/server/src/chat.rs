use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use querystream_agent::ResponseResolver;
use querystream_core::{
    validate_message, ApplicationError, ChatMessage, ClientInputError, ConversationContext, Sender,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    resolver: Arc<ResponseResolver>,
    max_message_chars: usize,
}

impl ChatState {
    pub fn new(resolver: Arc<ResponseResolver>, max_message_chars: usize) -> Self {
        Self { resolver, max_message_chars }
    }
}

/// `message` stays untyped so a number or object yields the same 400 as a
/// missing field instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(rename = "conversationHistory", default)]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    fn into_message(self, received_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            sender: self.sender,
            text: self.text,
            timestamp: self.timestamp.unwrap_or(received_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ChatError {
    pub error: String,
}

pub fn router(state: ChatState) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(state)
}

async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ChatError>)> {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(request) = payload.map_err(|rejection| {
        reject(ClientInputError::MalformedBody(rejection.body_text()), &correlation_id)
    })?;

    let message = request.message.as_ref().and_then(Value::as_str);
    let message = validate_message(message, state.max_message_chars)
        .map_err(|error| reject(error, &correlation_id))?;

    let received_at = Utc::now();
    let history: ConversationContext = request
        .conversation_history
        .unwrap_or_default()
        .into_iter()
        .map(|entry| entry.into_message(received_at))
        .collect::<Vec<_>>()
        .into();

    let resolution =
        state.resolver.resolve_detailed(message, history.messages(), &correlation_id).await;

    info!(
        event_name = "chat.request.completed",
        correlation_id = %correlation_id,
        outcome = resolution.outcome.label(),
        history_len = history.messages().len(),
        "chat request completed"
    );

    Ok(Json(ChatResponse { response: resolution.reply.text }))
}

fn reject(error: ClientInputError, correlation_id: &str) -> (StatusCode, Json<ChatError>) {
    let interface = ApplicationError::from(error).into_interface(correlation_id);
    warn!(
        event_name = "chat.request.rejected",
        correlation_id = %interface.correlation_id(),
        reason = %interface,
        "chat request rejected"
    );
    (StatusCode::BAD_REQUEST, Json(ChatError { error: interface.user_message().to_string() }))
}
