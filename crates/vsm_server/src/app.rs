//! Router and shared state.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use vsm_core::config::Settings;
use vsm_core::orchestrator::BatchProcessor;

use crate::handlers;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub processor: Arc<BatchProcessor>,
    /// Cancelled on shutdown; each request works under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        processor: Arc<BatchProcessor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            settings,
            processor,
            shutdown,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::landing))
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
