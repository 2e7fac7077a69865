//! HTTP router for flowsync

use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::sync::{SyncCoordinator, TriggerOutcome};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current time, RFC 3339
    pub ts: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/trigger", get(trigger_handler))
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        ts: chrono::Utc::now().to_rfc3339(),
    })
}

/// Runs a full cycle and reports its outcome
///
/// Answers `busy` at once while a previous cycle is running.
async fn trigger_handler(State(state): State<AppState>) -> Json<TriggerOutcome> {
    tracing::info!("Manual sync triggered");
    Json(state.coordinator.trigger_all().await)
}
