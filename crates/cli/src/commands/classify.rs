use querystream_agent::scope::{ScopeFilter, ScopeVocabulary};
use querystream_agent::ScopeVerdict;
use querystream_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG};

#[derive(Debug, Serialize)]
struct ClassifyReport {
    command: &'static str,
    status: &'static str,
    message_chars: usize,
    #[serde(flatten)]
    verdict: ScopeVerdict,
}

pub fn run(message: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "classify",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let filter = ScopeFilter::new(ScopeVocabulary::from_config(&config.scope));
    CommandResult::report(&ClassifyReport {
        command: "classify",
        status: "ok",
        message_chars: message.chars().count(),
        verdict: filter.classify(message),
    })
}
