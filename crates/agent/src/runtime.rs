use std::sync::Arc;
use std::time::Duration;

use querystream_core::config::AppConfig;
use querystream_core::{ApplicationError, ChatMessage, DomainKnowledge};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::fallback::{FallbackRuleId, FallbackTable};
use crate::llm::{GenerationParams, LlmClient, LlmError};
use crate::prompt::{PromptComposer, StyleConfig};
use crate::scope::{ScopeFilter, ScopeReason, ScopeVocabulary};

pub const REDIRECT_MESSAGE: &str = "Sorry, I can only answer questions related to QueryStream. \
    I can help you with our AI chatbot solutions, pricing, features, setup process, technical \
    details, or how we can help your UK business. What would you like to know about QueryStream?";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Redirected { reason: ScopeReason },
    Generated,
    Fallback { rule: FallbackRuleId, cause: &'static str },
}

impl ResolutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Redirected { .. } => "redirected",
            Self::Generated => "generated",
            Self::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub reply: ChatMessage,
    pub outcome: ResolutionOutcome,
}

/// Routes one inbound message to a reply: redirect, generated text, or a
/// fallback. Immutable after construction and safe to share across requests.
pub struct ResponseResolver {
    filter: ScopeFilter,
    composer: PromptComposer,
    fallbacks: FallbackTable,
    client: Arc<dyn LlmClient>,
    params: GenerationParams,
    timeout: Duration,
    knowledge: Arc<DomainKnowledge>,
}

impl ResponseResolver {
    pub fn from_config(
        config: &AppConfig,
        knowledge: Arc<DomainKnowledge>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        let window = config.chat.history_window;
        let filter = ScopeFilter::new(ScopeVocabulary::from_config(&config.scope));
        let composer = PromptComposer::new(&knowledge, StyleConfig::from(&config.style), window);
        let fallbacks =
            FallbackTable::from_knowledge(&knowledge, &filter.vocabulary().greetings, window);

        Self {
            filter,
            composer,
            fallbacks,
            client,
            params: GenerationParams::from(&config.llm),
            timeout: Duration::from_secs(config.llm.timeout_secs),
            knowledge,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn filter(&self) -> &ScopeFilter {
        &self.filter
    }

    pub fn knowledge(&self) -> &DomainKnowledge {
        &self.knowledge
    }

    pub async fn resolve(&self, message: &str, history: &[ChatMessage]) -> ChatMessage {
        let correlation_id = Uuid::new_v4().to_string();
        self.resolve_detailed(message, history, &correlation_id).await.reply
    }

    pub async fn resolve_detailed(
        &self,
        message: &str,
        history: &[ChatMessage],
        correlation_id: &str,
    ) -> Resolution {
        let message_chars = message.chars().count();
        let verdict = self.filter.classify(message);

        if !verdict.in_scope {
            info!(
                event_name = "chat.resolve.redirected",
                correlation_id = %correlation_id,
                message_chars,
                step = verdict.reason.step(),
                "message outside business domain"
            );
            return Resolution {
                reply: ChatMessage::bot(REDIRECT_MESSAGE),
                outcome: ResolutionOutcome::Redirected { reason: verdict.reason },
            };
        }

        let prompt = self.composer.compose(history, message);
        match self.generate(&prompt).await {
            Ok(text) => {
                info!(
                    event_name = "chat.resolve.generated",
                    correlation_id = %correlation_id,
                    message_chars,
                    reply_chars = text.chars().count(),
                    "generated reply"
                );
                Resolution { reply: ChatMessage::bot(text), outcome: ResolutionOutcome::Generated }
            }
            Err(llm_error) => {
                let rule = self.fallbacks.select(message, history);
                let cause = llm_error.cause();
                match ApplicationError::from(llm_error) {
                    failure @ ApplicationError::Configuration(_) => error!(
                        event_name = "chat.resolve.fallback",
                        correlation_id = %correlation_id,
                        message_chars,
                        rule = rule.id.as_str(),
                        cause,
                        error = %failure,
                        "generation credential missing, serving fallback"
                    ),
                    failure => warn!(
                        event_name = "chat.resolve.fallback",
                        correlation_id = %correlation_id,
                        message_chars,
                        rule = rule.id.as_str(),
                        cause,
                        error = %failure,
                        "generation failed, serving fallback"
                    ),
                }
                Resolution {
                    reply: ChatMessage::bot(rule.response.clone()),
                    outcome: ResolutionOutcome::Fallback { rule: rule.id, cause },
                }
            }
        }
    }

    /// One attempt, bounded by the configured timeout. Expiry drops the
    /// in-flight call.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let text = tokio::time::timeout(self.timeout, self.client.complete(prompt, &self.params))
            .await
            .map_err(|_| LlmError::Timeout { after_secs: self.timeout.as_secs() })??;

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::MalformedPayload("generated text is empty".to_string()));
        }
        Ok(text.to_string())
    }
}
