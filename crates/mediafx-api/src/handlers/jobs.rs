//! Job status and result handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;

use mediafx_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    /// Job ID
    pub job_id: String,
    /// Current status: queued, processing, done, failed
    pub status: String,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// When the job was admitted (RFC3339)
    pub created_at: String,
}

/// GET /api/jobs/:job_id/status
///
/// Returns:
/// - 200: current status, with `error_detail` when failed
/// - 404: unknown job handle
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = JobId::from_string(job_id);
    let snapshot = state.manager.status(&id).map_err(ApiError::from)?;

    Ok(Json(JobStatusResponse {
        job_id: snapshot.id.to_string(),
        status: snapshot.status.as_str().to_string(),
        error_detail: snapshot.error_detail,
        created_at: snapshot.created_at.to_rfc3339(),
    }))
}

/// GET /api/jobs/:job_id/result
///
/// Stream the final artifact. Delivery is single-use: once the stream
/// completes (or fails), the artifact and workspace are reclaimed and later
/// requests observe 410.
///
/// Returns:
/// - 200: `video/mp4` byte stream
/// - 404: unknown job handle
/// - 409: job is not done yet (or failed)
/// - 410: result was already delivered
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(job_id);
    let handle = state.manager.open_result(&id).map_err(ApiError::from)?;

    info!(job_id = %id, artifact = %handle.path.display(), "Streaming result");

    // If the open fails, dropping the claimed handle reclaims the job,
    // consistent with a failed delivery.
    let file = tokio::fs::File::open(&handle.path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to open artifact: {e}")))?;

    // The guard rides inside the stream: when the body is dropped, on
    // completion or on a broken connection, delivery finalizes exactly once.
    let guard = handle.guard;
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _hold = &guard;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"montage.mp4\"",
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}
