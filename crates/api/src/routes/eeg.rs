use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::handlers::eeg;
use crate::state::AppState;

/// Routes mounted at `/api/eeg`.
///
/// ```text
/// POST /upload     accept a recording, respond 202 with a tracking id
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(eeg::upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
