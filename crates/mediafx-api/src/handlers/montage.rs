//! Submission handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use mediafx_models::{JobStatus, RawClip};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of `POST /montage`: the clip list under its `clips` wrapper key.
/// This is the one canonical request shape; normalization into an execution
/// plan happens here at the transport boundary, never in the pipeline.
#[derive(Debug, Deserialize)]
pub struct MontageRequest {
    pub clips: Vec<RawClip>,
}

/// Response for an admitted montage job.
#[derive(Debug, Serialize)]
pub struct MontageResponse {
    pub job_id: String,
    pub status: String,
}

/// POST /montage
///
/// Admit a montage plan and schedule it for background processing.
///
/// Returns:
/// - 202: job admitted; poll `/api/jobs/:job_id/status`
/// - 400: structured rejection (`empty_plan`, `too_many_clips`,
///   `total_duration_exceeded`)
/// - 503: rejection with code `at_capacity`
pub async fn submit_montage(
    State(state): State<AppState>,
    Json(request): Json<MontageRequest>,
) -> ApiResult<(StatusCode, Json<MontageResponse>)> {
    info!(clips = request.clips.len(), "submit_montage");

    let job_id = state.manager.submit(&request.clips)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(MontageResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Queued.as_str().to_string(),
        }),
    ))
}

/// Body of `POST /trim`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimRequest {
    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,
    pub start: Option<f64>,
    pub duration: Option<f64>,
}

/// Response for `POST /trim`.
#[derive(Debug, Serialize)]
pub struct TrimResponse {
    pub ok: bool,
    pub received: TrimRequest,
}

/// POST /trim
///
/// Validation echo for a single clip reference. No job is created; this is
/// a transport self-test used by upstream automations.
pub async fn trim_echo(Json(request): Json<TrimRequest>) -> ApiResult<Json<TrimResponse>> {
    let valid = request.video_url.as_deref().is_some_and(|u| !u.is_empty())
        && request.start.is_some()
        && request.duration.is_some();
    if !valid {
        return Err(ApiError::bad_request(
            "Missing or invalid videoUrl/start/duration",
        ));
    }

    Ok(Json(TrimResponse {
        ok: true,
        received: request,
    }))
}
