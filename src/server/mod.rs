pub mod handlers;
pub mod protocol;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::search::semantic::Diagnoser;

/// Shared handler state. Everything here is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub diagnoser: Arc<Diagnoser>,
    pub default_top_k: usize,
    /// Bounds in-flight encoder calls; one permit serializes them.
    pub encode_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(diagnoser: Diagnoser, config: &Config) -> Self {
        Self {
            diagnoser: Arc::new(diagnoser),
            default_top_k: config.effective_top_k(),
            encode_permits: Arc::new(Semaphore::new(config.effective_concurrency())),
        }
    }
}

pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/predict", post(handlers::predict))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
}

/// Bind the listener and serve until ctrl-c. Failing to bind is the only
/// fatal error.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding HTTP listener on {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}
