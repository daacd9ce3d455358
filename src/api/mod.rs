//! Web API module for heximage
//!
//! Provides REST API endpoints for:
//! - Drawing a single pixel
//! - Reading the packed canvas buffer
//! - Health checks

pub mod board;
pub mod draw;
pub mod error;
pub mod health;

use axum::routing::{get, post};
use axum::Router;
use heximage_core::{DrawGateway, HubHandle, SharedBackend};
use std::sync::Arc;

pub use error::ApiError;
pub use health::health_routes;

/// State shared by every HTTP and WebSocket handler
pub struct AppState {
    pub gateway: DrawGateway,
    pub hub: HubHandle,
    /// Backing store, for health checks
    pub backend: SharedBackend,
}

/// Create the API router with all canvas endpoints
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/place/draw", post(draw::draw_pixel))
        .route("/api/place/board-bitmap", get(board::board_bitmap))
        .with_state(state)
}
