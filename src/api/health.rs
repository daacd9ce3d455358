//! Health check endpoint
//!
//! `/health` reports "healthy" + version, the live subscriber count and a
//! store round trip, for load balancers and smoke tests.

use super::AppState;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Live WebSocket subscribers; `None` once the hub has stopped
    pub subscribers: Option<usize>,
    pub store: &'static str,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let subscribers = state.hub.subscriber_count().await;
    let store = match state.backend.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            warn!(error = %e, "Canvas store health check failed");
            "unhealthy"
        }
    };

    let status = match (subscribers.is_some(), store) {
        (true, "healthy") => "healthy",
        (false, "unhealthy") => "unhealthy",
        _ => "degraded",
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        subscribers,
        store,
    })
}

/// Create health routes
pub fn health_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}
