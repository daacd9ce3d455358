//! Canvas bitmap endpoint

use super::{ApiError, AppState};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

/// HTTP-date format for `Last-Modified`
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// GET /api/place/board-bitmap
///
/// Returns the packed RGBA buffer, `width * height * 4` bytes, row-major.
pub async fn board_bitmap(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let canvas = state.gateway.read_canvas().await?;
    let last_modified = Utc::now().format(HTTP_DATE).to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CACHE_CONTROL, "public, max-age=30".to_string()),
            (header::LAST_MODIFIED, last_modified),
        ],
        canvas.into_bytes(),
    )
        .into_response())
}
