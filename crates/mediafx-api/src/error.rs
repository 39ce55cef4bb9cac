//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use mediafx_models::AdmissionError;
use mediafx_pipeline::{JobQueryError, SubmitError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Structured submission rejection with a stable reason code.
    #[error("{0}")]
    Rejected(#[from] AdmissionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(AdmissionError::AtCapacity { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<String> {
        match self {
            ApiError::Rejected(rejection) => Some(rejection.code().to_string()),
            _ => None,
        }
    }
}

impl From<JobQueryError> for ApiError {
    fn from(err: JobQueryError) -> Self {
        match err {
            JobQueryError::NotFound => ApiError::NotFound("Job not found".to_string()),
            JobQueryError::NotReady(status) => {
                ApiError::Conflict(format!("Job is not done (status: {status})"))
            }
            JobQueryError::Gone => ApiError::Gone("Result already delivered".to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(rejection) => ApiError::Rejected(rejection),
            SubmitError::Workspace(e) => ApiError::Internal(format!("workspace allocation: {e}")),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_rejections_carry_codes() {
        let err = ApiError::from(SubmitError::Rejected(AdmissionError::EmptyPlan));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code().as_deref(), Some("empty_plan"));

        let err = ApiError::Rejected(AdmissionError::AtCapacity { active: 2, max: 2 });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code().as_deref(), Some("at_capacity"));
    }

    #[test]
    fn test_query_error_mapping() {
        use mediafx_models::JobStatus;

        assert_eq!(
            ApiError::from(JobQueryError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(JobQueryError::NotReady(JobStatus::Processing)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(JobQueryError::Gone).status_code(),
            StatusCode::GONE
        );
    }
}
