//! HTTP server for the emotion panels.

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use super::handlers;
use crate::config::ServerSettings;
use crate::registry::EmotionModels;

/// Shared state for the handlers
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<EmotionModels>,
    /// Where voice uploads are spooled while they are analyzed
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(models: Arc<EmotionModels>) -> Self {
        Self {
            models,
            upload_dir: std::env::temp_dir(),
        }
    }
}

/// Build the router with every panel endpoint
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/text", post(handlers::analyze_text))
        .route("/api/face", post(handlers::analyze_face))
        .route("/api/voice", post(handlers::analyze_voice))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve until ctrl-c
pub async fn serve(models: Arc<EmotionModels>, settings: &ServerSettings) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| {
            format!("Invalid listen address {}:{}", settings.host, settings.port)
        })?;

    let app = router(AppState::new(models), settings.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind server to {}: {}", addr, e);
        anyhow::anyhow!("Failed to bind {}: {}", addr, e)
    })?;
    info!("Emotion insight server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
