use std::sync::Arc;

use querystream_agent::{GeminiClient, ResolutionOutcome, ResponseResolver};
use querystream_core::config::{AppConfig, LoadOptions};
use querystream_core::{validate_message, DomainKnowledge};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INPUT, EXIT_KNOWLEDGE, EXIT_RUNTIME};

#[derive(Debug, Serialize)]
struct AskReport {
    command: &'static str,
    status: &'static str,
    resolution: ResolutionOutcome,
    response: String,
}

pub fn run(message: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };

    if let Err(error) = validate_message(Some(message), config.chat.max_message_chars) {
        return CommandResult::failure("ask", "client_input", error.to_string(), EXIT_INPUT);
    }

    let knowledge = match DomainKnowledge::load(config.chat.knowledge_path.as_deref()) {
        Ok(knowledge) => knowledge,
        Err(error) => {
            return CommandResult::failure("ask", "knowledge", error.to_string(), EXIT_KNOWLEDGE)
        }
    };

    let client = match GeminiClient::new(&config.llm) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("ask", "llm_client", error.to_string(), EXIT_RUNTIME)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        }
    };

    let resolver = ResponseResolver::from_config(&config, Arc::new(knowledge), Arc::new(client));
    let resolution = runtime.block_on(resolver.resolve_detailed(message, &[], "cli"));

    CommandResult::report(&AskReport {
        command: "ask",
        status: "ok",
        resolution: resolution.outcome,
        response: resolution.reply.text,
    })
}
