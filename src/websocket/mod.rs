//! WebSocket module for heximage
//!
//! Provides real-time communication endpoints:
//! - /api/place/live - Draw requests in, change messages out

pub mod live;

pub use live::live_handler;

use crate::api::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the WebSocket router
pub fn websocket_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/place/live", get(live_handler))
        .with_state(state)
}
