use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    credential_configured: bool,
    knowledge_version: String,
}

impl HealthState {
    pub fn new(credential_configured: bool, knowledge_version: impl Into<String>) -> Self {
        Self { credential_configured, knowledge_version: knowledge_version.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub generation: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Degraded still answers chat, from the fallback table only.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let generation = generation_check(state.credential_configured);
    let ready = generation.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("knowledge catalogue {} loaded", state.knowledge_version),
        },
        generation,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn generation_check(credential_configured: bool) -> HealthCheck {
    if credential_configured {
        HealthCheck { status: "ready", detail: "generation credential configured".to_string() }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "generation credential missing; serving fallback replies".to_string(),
        }
    }
}
