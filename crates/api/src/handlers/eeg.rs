//! Handlers for the `/api/eeg` resource.
//!
//! Uploads are accepted immediately with a tracking id; the result arrives
//! later over the hub connection bound to that id.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hyperspace_core::shape::JobPayload;
use hyperspace_core::types::TrackingToken;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the recording.
const FILE_FIELD: &str = "file";

const NO_FILE_MESSAGE: &str = "No file was uploaded.";

/// Body of a `202 Accepted` upload response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub tracking_id: TrackingToken,
}

/// POST /api/eeg/upload
///
/// Accept a recording for background processing. Returns 202 with the
/// tracking id before any processing starts.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut upload: Option<JobPayload> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or(FILE_FIELD).to_string();
        let contents = field.bytes().await?;

        upload = Some(JobPayload {
            file_name,
            contents: contents.to_vec(),
        });
    }

    let payload = upload
        .filter(|p| !p.contents.is_empty())
        .ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))?;

    tracing::info!(
        file_name = %payload.file_name,
        bytes = payload.contents.len(),
        "Accepted file for processing",
    );

    let tracking_id = state.tokens.issue()?;
    state.executor.submit(tracking_id.clone(), payload)?;

    tracing::info!(tracking_id = %tracking_id, "Returning tracking id to client immediately");

    Ok((StatusCode::ACCEPTED, Json(UploadAccepted { tracking_id })))
}
