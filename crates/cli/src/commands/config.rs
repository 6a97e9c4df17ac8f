use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use querystream_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let sources = Sources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path,
    };

    let llm_api_key = if config.llm.has_api_key() { "<redacted>" } else { "<unset>" };
    let knowledge_path = config
        .chat
        .knowledge_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    let max_words = config
        .style
        .max_words
        .map(|words| words.to_string())
        .unwrap_or_else(|| "<none>".to_string());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "llm.api_key",
        llm_api_key,
        &["QUERYSTREAM_LLM_API_KEY", "GEMINI_API_KEY"],
    ));
    lines.push(sources.line("llm.base_url", &config.llm.base_url, &["QUERYSTREAM_LLM_BASE_URL"]));
    lines.push(sources.line("llm.model", &config.llm.model, &["QUERYSTREAM_LLM_MODEL"]));
    lines.push(sources.line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["QUERYSTREAM_LLM_TIMEOUT_SECS"],
    ));
    lines.push(sources.line(
        "llm.max_output_tokens",
        &config.llm.max_output_tokens.to_string(),
        &["QUERYSTREAM_LLM_MAX_OUTPUT_TOKENS"],
    ));
    lines.push(sources.line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        &["QUERYSTREAM_LLM_TEMPERATURE"],
    ));
    lines.push(sources.line("llm.top_k", &config.llm.top_k.to_string(), &[]));
    lines.push(sources.line("llm.top_p", &config.llm.top_p.to_string(), &[]));

    lines.push(sources.line(
        "server.bind_address",
        &config.server.bind_address,
        &["QUERYSTREAM_SERVER_BIND_ADDRESS"],
    ));
    lines.push(sources.line(
        "server.port",
        &config.server.port.to_string(),
        &["QUERYSTREAM_SERVER_PORT", "PORT"],
    ));
    lines.push(sources.line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["QUERYSTREAM_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    ));

    lines.push(sources.line(
        "chat.history_window",
        &config.chat.history_window.to_string(),
        &["QUERYSTREAM_CHAT_HISTORY_WINDOW"],
    ));
    lines.push(sources.line(
        "chat.max_message_chars",
        &config.chat.max_message_chars.to_string(),
        &["QUERYSTREAM_CHAT_MAX_MESSAGE_CHARS"],
    ));
    lines.push(sources.line(
        "chat.knowledge_path",
        &knowledge_path,
        &["QUERYSTREAM_CHAT_KNOWLEDGE_PATH"],
    ));

    lines.push(sources.line(
        "scope.short_message_threshold",
        &config.scope.short_message_threshold.to_string(),
        &["QUERYSTREAM_SCOPE_SHORT_MESSAGE_THRESHOLD"],
    ));
    for (key_path, list) in [
        ("scope.greetings", &config.scope.greetings),
        ("scope.off_topic", &config.scope.off_topic),
        ("scope.keywords", &config.scope.keywords),
    ] {
        let value = list
            .as_ref()
            .map(|entries| format!("{} entries", entries.len()))
            .unwrap_or_else(|| "<built-in>".to_string());
        lines.push(sources.line(key_path, &value, &[]));
    }

    let tone = format!("{:?}", config.style.tone);
    lines.push(sources.line("style.tone", &tone, &["QUERYSTREAM_STYLE_TONE"]));
    lines.push(sources.line("style.max_words", &max_words, &["QUERYSTREAM_STYLE_MAX_WORDS"]));
    lines.push(sources.line(
        "style.repeat_greetings",
        &config.style.repeat_greetings.to_string(),
        &["QUERYSTREAM_STYLE_REPEAT_GREETINGS"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["QUERYSTREAM_LOGGING_LEVEL", "QUERYSTREAM_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["QUERYSTREAM_LOGGING_FORMAT", "QUERYSTREAM_LOG_FORMAT"],
    ));

    lines.join("\n")
}

struct Sources {
    doc: Option<Value>,
    path: Option<PathBuf>,
}

impl Sources {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        let source = field_source(key_path, env_keys, self.doc.as_ref(), self.path.as_deref());
        render_line(key_path, value, source)
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("querystream.toml"), PathBuf::from("config/querystream.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    // Empty values are ignored by the loader, so they do not count as a source.
    if let Some(env_key) = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
