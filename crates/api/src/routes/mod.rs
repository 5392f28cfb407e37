pub mod eeg;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /health                 service health
/// /neurohub               hub WebSocket
/// /api/eeg/upload         submit a recording (POST, multipart)
/// ```
pub fn app_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .route("/neurohub", get(ws::ws_handler))
        .nest("/api/eeg", eeg::router(max_upload_bytes))
}
