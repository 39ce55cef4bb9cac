//! Admission rejection reasons.
//!
//! Rejections happen synchronously at submission time; no job is created.
//! Each variant carries a stable reason code for the transport layer.

use thiserror::Error;

/// Why a submission was rejected without creating a job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    /// No valid clip entries remained after normalization.
    #[error("plan contains no valid clip entries")]
    EmptyPlan,

    /// The normalized plan has more clips than the configured maximum.
    #[error("plan has {count} clips, exceeding the maximum of {max}")]
    TooManyClips { count: usize, max: usize },

    /// The sum of clip durations exceeds the configured maximum.
    #[error("total duration {total:.1}s exceeds the maximum of {max:.1}s")]
    TotalDurationExceeded { total: f64, max: f64 },

    /// The configured concurrent-job ceiling has been reached.
    #[error("server is at capacity ({active}/{max} active jobs)")]
    AtCapacity { active: usize, max: usize },
}

impl AdmissionError {
    /// Stable reason code exposed over the transport contract.
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::EmptyPlan => "empty_plan",
            AdmissionError::TooManyClips { .. } => "too_many_clips",
            AdmissionError::TotalDurationExceeded { .. } => "total_duration_exceeded",
            AdmissionError::AtCapacity { .. } => "at_capacity",
        }
    }
}
