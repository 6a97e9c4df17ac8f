use std::time::Duration;

use async_trait::async_trait;
use querystream_core::config::LlmConfig;
use querystream_core::ApplicationError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker labels that must end generation, matching the transcript format.
pub const STOP_SEQUENCES: [&str; 2] = ["User:", "Assistant:"];

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl From<&LlmConfig> for GenerationParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            stop_sequences: STOP_SEQUENCES.iter().map(|label| label.to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API credential is configured for the generation service")]
    MissingCredential,
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation response was malformed: {0}")]
    MalformedPayload(String),
    #[error("generation did not complete within {after_secs}s")]
    Timeout { after_secs: u64 },
}

impl LlmError {
    /// Stable label for the failure, used in logs and fallback diagnostics.
    pub fn cause(&self) -> &'static str {
        match self {
            Self::MissingCredential => "configuration",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Timeout { .. } => "timeout",
        }
    }
}

impl From<LlmError> for ApplicationError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::MissingCredential => Self::Configuration(error.to_string()),
            other => Self::ExternalCall(other.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfigBody<'a>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    stop_sequences: &'a [String],
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn build_request<'a>(prompt: &'a str, params: &'a GenerationParams) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: [RequestContent { parts: [RequestPart { text: prompt }] }],
        generation_config: GenerationConfigBody {
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            max_output_tokens: params.max_output_tokens,
            stop_sequences: &params.stop_sequences,
        },
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a response body. Any
/// missing link, or text that is blank, is a malformed payload.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|error| LlmError::MalformedPayload(format!("invalid JSON: {error}")))?;

    let text = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| LlmError::MalformedPayload("no candidates".to_string()))?
        .content
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| LlmError::MalformedPayload("candidate has no text part".to_string()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::MalformedPayload("candidate text is empty".to_string()));
    }
    Ok(text.to_string())
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect()
}

/// Client for the `generateContent` endpoint of the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let api_key = config.api_key.clone().filter(|key| !key.expose_secret().trim().is_empty());

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// The HTTP client's own deadline counts as a timeout, not a transport failure.
    fn request_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout { after_secs: self.timeout_secs }
        } else {
            LlmError::Transport(error)
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingCredential)?;

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", api_key.expose_secret())])
            .json(&build_request(prompt, params))
            .send()
            .await
            .map_err(|error| self.request_error(error))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| self.request_error(error))?;

        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body: preview(&body) });
        }

        extract_text(&body)
    }
}
