mod bootstrap;
mod chat;
mod health;

use std::any::Any;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use querystream_core::config::{AppConfig, LoadOptions};
use querystream_core::ApplicationError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::bootstrap::Application;

fn init_logging(config: &AppConfig) {
    use querystream_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        generation = if app.credential_configured { "ready" } else { "degraded" },
        "querystream-server listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, build_router(&app))
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "querystream-server stopping"
    );
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "in-flight requests did not finish before the grace period"
        ),
    }

    Ok(())
}

fn build_router(app: &Application) -> Router {
    let chat_state =
        chat::ChatState::new(app.resolver.clone(), app.config.chat.max_message_chars);
    let health_state = health::HealthState::new(
        app.credential_configured,
        app.resolver.knowledge().version.clone(),
    );

    with_layers(chat::router(chat_state).merge(health::router(health_state)))
}

fn with_layers(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(apology_for_panic)).layer(TraceLayer::new_for_http())
}

fn apology_for_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    let interface = ApplicationError::Unhandled(format!("request handler panicked: {detail}"))
        .into_interface(uuid::Uuid::new_v4().to_string());
    tracing::error!(
        event_name = "system.server.panic",
        correlation_id = %interface.correlation_id(),
        reason = %interface,
        "request handler panicked"
    );

    let body = chat::ChatError { error: interface.user_message().to_string() };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use querystream_core::config::{ConfigOverrides, LoadOptions};
    use querystream_core::APOLOGY_MESSAGE;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{bootstrap, build_router, with_layers};

    async fn boom() -> &'static str {
        panic!("handler exploded");
    }

    #[tokio::test]
    async fn panics_become_apology_responses() {
        let app = with_layers(Router::new().route("/boom", get(boom)));
        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn router_serves_chat_and_health() {
        let app = bootstrap::bootstrap(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                llm_api_key: Some(String::new()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap");
        let router = build_router(&app);

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(health.status(), StatusCode::SERVICE_UNAVAILABLE);

        let chat = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"What's your pricing?"}"#))
                    .expect("request"),
            )
            .await
            .expect("chat response");
        assert_eq!(chat.status(), StatusCode::OK);

        let bytes = to_bytes(chat.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        let reply = body["response"].as_str().expect("response text");
        assert!(reply.contains("Starter Package"));
        assert!(reply.contains("Professional Package"));
    }
}
