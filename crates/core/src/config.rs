use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub scope: ScopeConfig,
    pub style: StyleSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl LlmConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub history_window: usize,
    pub max_message_chars: usize,
    pub knowledge_path: Option<PathBuf>,
}

/// Overrides for the domain filter vocabulary. `None` keeps the built-in list.
#[derive(Clone, Debug)]
pub struct ScopeConfig {
    pub short_message_threshold: usize,
    pub greetings: Option<Vec<String>>,
    pub off_topic: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct StyleSettings {
    pub tone: Tone,
    pub max_words: Option<u32>,
    pub repeat_greetings: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Conversational,
    Comprehensive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub server_port: Option<u16>,
    pub knowledge_path: Option<PathBuf>,
    pub tone: Option<Tone>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-pro".to_string(),
                timeout_secs: 25,
                max_output_tokens: 500,
                temperature: 0.8,
                top_k: 40,
                top_p: 0.95,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            chat: ChatConfig { history_window: 4, max_message_chars: 1000, knowledge_path: None },
            scope: ScopeConfig {
                short_message_threshold: 25,
                greetings: None,
                off_topic: None,
                keywords: None,
            },
            style: StyleSettings {
                tone: Tone::Conversational,
                max_words: Some(120),
                repeat_greetings: false,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for Tone {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conversational" => Ok(Self::Conversational),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(ConfigError::Validation(format!(
                "unsupported style tone `{other}` (expected conversational|comprehensive)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("querystream.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_output_tokens) = llm.max_output_tokens {
                self.llm.max_output_tokens = max_output_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(top_k) = llm.top_k {
                self.llm.top_k = top_k;
            }
            if let Some(top_p) = llm.top_p {
                self.llm.top_p = top_p;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(chat) = patch.chat {
            if let Some(history_window) = chat.history_window {
                self.chat.history_window = history_window;
            }
            if let Some(max_message_chars) = chat.max_message_chars {
                self.chat.max_message_chars = max_message_chars;
            }
            if let Some(knowledge_path) = chat.knowledge_path {
                self.chat.knowledge_path = Some(knowledge_path);
            }
        }

        if let Some(scope) = patch.scope {
            if let Some(threshold) = scope.short_message_threshold {
                self.scope.short_message_threshold = threshold;
            }
            if let Some(greetings) = scope.greetings {
                self.scope.greetings = Some(greetings);
            }
            if let Some(off_topic) = scope.off_topic {
                self.scope.off_topic = Some(off_topic);
            }
            if let Some(keywords) = scope.keywords {
                self.scope.keywords = Some(keywords);
            }
        }

        if let Some(style) = patch.style {
            if let Some(tone) = style.tone {
                self.style.tone = tone;
            }
            if let Some(max_words) = style.max_words {
                self.style.max_words = (max_words > 0).then_some(max_words);
            }
            if let Some(repeat_greetings) = style.repeat_greetings {
                self.style.repeat_greetings = repeat_greetings;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let api_key = read_env("QUERYSTREAM_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUERYSTREAM_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("QUERYSTREAM_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("QUERYSTREAM_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("QUERYSTREAM_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("QUERYSTREAM_LLM_MAX_OUTPUT_TOKENS") {
            self.llm.max_output_tokens = parse_u32("QUERYSTREAM_LLM_MAX_OUTPUT_TOKENS", &value)?;
        }
        if let Some(value) = read_env("QUERYSTREAM_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("QUERYSTREAM_LLM_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("QUERYSTREAM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port =
            read_env("QUERYSTREAM_SERVER_PORT").map(|value| ("QUERYSTREAM_SERVER_PORT", value));
        if let Some((key, value)) = port.or_else(|| read_env("PORT").map(|value| ("PORT", value))) {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("QUERYSTREAM_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("QUERYSTREAM_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("QUERYSTREAM_CHAT_HISTORY_WINDOW") {
            self.chat.history_window = parse_usize("QUERYSTREAM_CHAT_HISTORY_WINDOW", &value)?;
        }
        if let Some(value) = read_env("QUERYSTREAM_CHAT_MAX_MESSAGE_CHARS") {
            self.chat.max_message_chars =
                parse_usize("QUERYSTREAM_CHAT_MAX_MESSAGE_CHARS", &value)?;
        }
        if let Some(value) = read_env("QUERYSTREAM_CHAT_KNOWLEDGE_PATH") {
            self.chat.knowledge_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("QUERYSTREAM_SCOPE_SHORT_MESSAGE_THRESHOLD") {
            self.scope.short_message_threshold =
                parse_usize("QUERYSTREAM_SCOPE_SHORT_MESSAGE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("QUERYSTREAM_STYLE_TONE") {
            self.style.tone = value.parse()?;
        }
        if let Some(value) = read_env("QUERYSTREAM_STYLE_MAX_WORDS") {
            let max_words = parse_u32("QUERYSTREAM_STYLE_MAX_WORDS", &value)?;
            self.style.max_words = (max_words > 0).then_some(max_words);
        }
        if let Some(value) = read_env("QUERYSTREAM_STYLE_REPEAT_GREETINGS") {
            self.style.repeat_greetings = parse_bool("QUERYSTREAM_STYLE_REPEAT_GREETINGS", &value)?;
        }

        let log_level =
            read_env("QUERYSTREAM_LOGGING_LEVEL").or_else(|| read_env("QUERYSTREAM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUERYSTREAM_LOGGING_FORMAT").or_else(|| read_env("QUERYSTREAM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_timeout_secs) = overrides.llm_timeout_secs {
            self.llm.timeout_secs = llm_timeout_secs;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(knowledge_path) = overrides.knowledge_path {
            self.chat.knowledge_path = Some(knowledge_path);
        }
        if let Some(tone) = overrides.tone {
            self.style.tone = tone;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_chat(&self.chat)?;
        validate_scope(&self.scope, &self.chat)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("querystream.toml"), PathBuf::from("config/querystream.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

// A missing api key is not a validation failure: the resolver answers from the
// fallback table and reports the gap as a configuration error per request.
fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    let base_url = llm.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.max_output_tokens == 0 || llm.max_output_tokens > 8192 {
        return Err(ConfigError::Validation(
            "llm.max_output_tokens must be in range 1..=8192".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.top_k == 0 {
        return Err(ConfigError::Validation("llm.top_k must be greater than zero".to_string()));
    }

    if !(0.0..=1.0).contains(&llm.top_p) {
        return Err(ConfigError::Validation("llm.top_p must be in range 0.0..=1.0".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.history_window == 0 || chat.history_window > 50 {
        return Err(ConfigError::Validation(
            "chat.history_window must be in range 1..=50".to_string(),
        ));
    }

    if chat.max_message_chars == 0 {
        return Err(ConfigError::Validation(
            "chat.max_message_chars must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_scope(scope: &ScopeConfig, chat: &ChatConfig) -> Result<(), ConfigError> {
    if scope.short_message_threshold > chat.max_message_chars {
        return Err(ConfigError::Validation(
            "scope.short_message_threshold must not exceed chat.max_message_chars".to_string(),
        ));
    }

    let lists = [
        ("scope.greetings", &scope.greetings),
        ("scope.off_topic", &scope.off_topic),
        ("scope.keywords", &scope.keywords),
    ];
    for (key, list) in lists {
        let has_blank =
            list.as_ref().map(|values| values.iter().any(|value| value.trim().is_empty()));
        if has_blank.unwrap_or(false) {
            return Err(ConfigError::Validation(format!("{key} must not contain blank entries")));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    chat: Option<ChatPatch>,
    scope: Option<ScopePatch>,
    style: Option<StylePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatPatch {
    history_window: Option<usize>,
    max_message_chars: Option<usize>,
    knowledge_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ScopePatch {
    short_message_threshold: Option<usize>,
    greetings: Option<Vec<String>>,
    off_topic: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct StylePatch {
    tone: Option<Tone>,
    max_words: Option<u32>,
    repeat_greetings: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, Tone};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const MANAGED_VARS: [&str; 8] = [
        "QUERYSTREAM_LLM_API_KEY",
        "GEMINI_API_KEY",
        "QUERYSTREAM_LLM_TIMEOUT_SECS",
        "QUERYSTREAM_SERVER_PORT",
        "PORT",
        "QUERYSTREAM_LOG_LEVEL",
        "QUERYSTREAM_LOG_FORMAT",
        "QUERYSTREAM_STYLE_TONE",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_api_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.llm.has_api_key(), "api key should be absent by default")?;
        ensure(config.llm.timeout_secs == 25, "default timeout should be 25 seconds")?;
        ensure(config.chat.history_window == 4, "default history window should be 4")?;
        ensure(config.chat.max_message_chars == 1000, "default message limit should be 1000")?;
        ensure(
            config.scope.short_message_threshold == 25,
            "default short message threshold should be 25",
        )?;
        ensure(config.style.tone == Tone::Conversational, "default tone is conversational")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("TEST_GEMINI_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("querystream.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_GEMINI_KEY}"

[style]
tone = "comprehensive"
max_words = 0
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "key-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.style.tone == Tone::Comprehensive, "tone should come from file")?;
            ensure(config.style.max_words.is_none(), "zero max_words should disable the limit")?;
            Ok(())
        })();

        clear_vars(&["TEST_GEMINI_KEY"]);
        result
    }

    #[test]
    fn gemini_api_key_alias_is_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("GEMINI_API_KEY", "legacy-key");
        env::set_var("QUERYSTREAM_LOG_LEVEL", "warn");
        env::set_var("QUERYSTREAM_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.has_api_key(), "legacy GEMINI_API_KEY should be honoured")?;
            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&MANAGED_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("QUERYSTREAM_SERVER_PORT", "4100");
        env::set_var("QUERYSTREAM_LLM_TIMEOUT_SECS", "10");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("querystream.toml");
            fs::write(
                &path,
                r#"
[server]
port = 4000

[llm]
timeout_secs = 5
model = "gemini-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    llm_timeout_secs: Some(20),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 4100, "env port should win over file")?;
            ensure(config.llm.timeout_secs == 20, "override timeout should win over env")?;
            ensure(config.llm.model == "gemini-from-file", "file model should win over default")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&MANAGED_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("QUERYSTREAM_LLM_TIMEOUT_SECS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.timeout_secs")
            );
            ensure(has_message, "validation failure should mention llm.timeout_secs")
        })();

        clear_vars(&MANAGED_VARS);
        result
    }

    #[test]
    fn invalid_env_value_reports_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("QUERYSTREAM_STYLE_TONE", "sarcastic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected tone parse failure".to_string()),
                Err(error) => error,
            };
            ensure(
                error.to_string().contains("conversational|comprehensive"),
                "tone error should list accepted values",
            )
        })();

        clear_vars(&MANAGED_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&MANAGED_VARS);

        env::set_var("QUERYSTREAM_LLM_API_KEY", "AIza-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("AIza-secret-value"),
                "debug output should not contain api key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&MANAGED_VARS);
        result
    }
}
