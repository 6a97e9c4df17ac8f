use std::env;
use std::sync::{Mutex, OnceLock};

use querystream_cli::commands::{ask, classify, config, doctor};
use serde_json::Value;

#[test]
fn config_redacts_api_key_and_attributes_env_source() {
    with_env(&[("QUERYSTREAM_LLM_API_KEY", "super-secret-key")], || {
        let output = config::run();

        assert!(!output.contains("super-secret-key"), "api key must never be printed");
        assert!(output
            .contains("- llm.api_key = <redacted> (source: env (QUERYSTREAM_LLM_API_KEY))"));
        assert!(output.contains("- llm.model = gemini-pro (source: default)"));
    });
}

#[test]
fn config_reports_alias_sources() {
    with_env(&[("GEMINI_API_KEY", "alias-key"), ("PORT", "8080")], || {
        let output = config::run();

        assert!(output.contains("- llm.api_key = <redacted> (source: env (GEMINI_API_KEY))"));
        assert!(output.contains("- server.port = 8080 (source: env (PORT))"));
    });
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("QUERYSTREAM_LLM_TIMEOUT_SECS", "0")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed:"));
    });
}

#[test]
fn doctor_fails_credential_check_without_api_key() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1, "expected failing readiness exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(check(&payload, "config_validation")["status"], "pass");
        assert_eq!(check(&payload, "generation_credential")["status"], "fail");
        assert_eq!(check(&payload, "domain_knowledge")["status"], "pass");
    });
}

#[test]
fn doctor_passes_with_api_key() {
    with_env(&[("QUERYSTREAM_LLM_API_KEY", "test-key")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected all checks to pass");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("QUERYSTREAM_SERVER_PORT", "not-a-port")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] generation_credential:"));
        assert!(result.output.contains("- [skip] domain_knowledge:"));
    });
}

#[test]
fn classify_reports_off_topic_veto() {
    with_env(&[], || {
        let result = classify::run("What's the weather like?");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "classify");
        assert_eq!(payload["in_scope"], false);
        assert_eq!(payload["reason"]["step"], "off_topic");
        assert_eq!(payload["reason"]["phrase"], "weather");
    });
}

#[test]
fn classify_allows_short_messages() {
    with_env(&[], || {
        let payload = parse_payload(&classify::run("a").output);
        assert_eq!(payload["in_scope"], true);
        assert_eq!(payload["reason"]["step"], "short_message");
        assert_eq!(payload["reason"]["length"], 1);
    });
}

#[test]
fn ask_without_credential_serves_fallback() {
    with_env(&[], || {
        let result = ask::run("What's your pricing?");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["resolution"]["outcome"], "fallback");
        assert_eq!(payload["resolution"]["rule"], "pricing");
        assert_eq!(payload["resolution"]["cause"], "configuration");

        let response = payload["response"].as_str().unwrap_or_default();
        assert!(response.contains("Starter Package: £150 setup + £40/month"));
        assert!(response.contains("Professional Package: £200 setup + £50/month"));
    });
}

#[test]
fn ask_redirects_off_topic_messages() {
    with_env(&[], || {
        let payload = parse_payload(&ask::run("any football news today?").output);
        assert_eq!(payload["resolution"]["outcome"], "redirected");
        assert_eq!(payload["resolution"]["reason"]["step"], "off_topic");
    });
}

#[test]
fn ask_rejects_oversized_message() {
    with_env(&[], || {
        let result = ask::run(&"a".repeat(1001));
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "client_input");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn check<'a>(payload: &'a Value, name: &str) -> &'a Value {
    payload["checks"]
        .as_array()
        .and_then(|checks| checks.iter().find(|check| check["name"] == name))
        .expect("check should be present")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "QUERYSTREAM_LLM_API_KEY",
        "GEMINI_API_KEY",
        "QUERYSTREAM_LLM_BASE_URL",
        "QUERYSTREAM_LLM_MODEL",
        "QUERYSTREAM_LLM_TIMEOUT_SECS",
        "QUERYSTREAM_LLM_MAX_OUTPUT_TOKENS",
        "QUERYSTREAM_LLM_TEMPERATURE",
        "QUERYSTREAM_SERVER_BIND_ADDRESS",
        "QUERYSTREAM_SERVER_PORT",
        "PORT",
        "QUERYSTREAM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "QUERYSTREAM_CHAT_HISTORY_WINDOW",
        "QUERYSTREAM_CHAT_MAX_MESSAGE_CHARS",
        "QUERYSTREAM_CHAT_KNOWLEDGE_PATH",
        "QUERYSTREAM_SCOPE_SHORT_MESSAGE_THRESHOLD",
        "QUERYSTREAM_STYLE_TONE",
        "QUERYSTREAM_STYLE_MAX_WORDS",
        "QUERYSTREAM_STYLE_REPEAT_GREETINGS",
        "QUERYSTREAM_LOGGING_LEVEL",
        "QUERYSTREAM_LOGGING_FORMAT",
        "QUERYSTREAM_LOG_LEVEL",
        "QUERYSTREAM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
