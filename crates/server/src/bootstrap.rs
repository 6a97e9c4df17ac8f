use std::sync::Arc;

use querystream_agent::{GeminiClient, LlmError, ResponseResolver};
use querystream_core::config::{AppConfig, ConfigError, LoadOptions};
use querystream_core::{DomainKnowledge, KnowledgeError};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub resolver: Arc<ResponseResolver>,
    pub credential_configured: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("domain knowledge could not be loaded: {0}")]
    Knowledge(#[from] KnowledgeError),
    #[error("generation client could not be built: {0}")]
    LlmClient(#[from] LlmError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let knowledge = DomainKnowledge::load(config.chat.knowledge_path.as_deref())?;
    info!(
        event_name = "system.bootstrap.knowledge_loaded",
        correlation_id = "bootstrap",
        knowledge_version = %knowledge.version,
        source = if config.chat.knowledge_path.is_some() { "file" } else { "built_in" },
        "domain knowledge loaded"
    );

    let client = GeminiClient::new(&config.llm)?;
    let credential_configured = client.has_credential();
    if credential_configured {
        info!(
            event_name = "system.bootstrap.generation_ready",
            correlation_id = "bootstrap",
            model = %config.llm.model,
            "generation client configured"
        );
    } else {
        warn!(
            event_name = "system.bootstrap.credential_missing",
            correlation_id = "bootstrap",
            "QUERYSTREAM_LLM_API_KEY is not set; chat will answer from fallback replies only"
        );
    }

    let resolver = ResponseResolver::from_config(&config, Arc::new(knowledge), Arc::new(client));

    Ok(Application { config, resolver: Arc::new(resolver), credential_configured })
}
