//! Pixel draw endpoint

use super::{ApiError, AppState};
use axum::{extract::State, http::StatusCode, Json};
use heximage_core::DrawOutcome;
use std::sync::Arc;

/// POST /api/place/draw
///
/// The body is read as text so malformed JSON gets the same `parse_error`
/// response as a bad field.
pub async fn draw_pixel(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<DrawOutcome>), ApiError> {
    let outcome = state.gateway.handle_draw_json(&body).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
