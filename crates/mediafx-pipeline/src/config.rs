//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use mediafx_models::ExtractionPolicy;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum clips in one plan after normalization
    pub max_clips: usize,
    /// Maximum sum of clip durations in one plan, seconds
    pub max_total_duration_secs: f64,
    /// Maximum jobs admitted and not yet terminal
    pub max_active_jobs: usize,
    /// Concurrent downloads within one job's acquisition step
    /// (1 degrades to fully sequential, the safe default)
    pub download_workers: usize,
    /// Bound on one source transfer; expiry fails the job
    pub download_timeout: Duration,
    /// Additional attempts after a failed transfer (0 = fail fast)
    pub download_retries: u32,
    /// Deployment-wide segment extraction policy
    pub extraction_policy: ExtractionPolicy,
    /// Process-wide cap on concurrent transcode invocations; None keeps
    /// only the per-job serialization floor
    pub transcode_slots: Option<usize>,
    /// Bound on one transcode invocation; None = unbounded
    pub transcode_timeout: Option<Duration>,
    /// Root directory for per-job scratch workspaces
    pub scratch_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_clips: 20,
            max_total_duration_secs: 600.0,
            max_active_jobs: 2,
            download_workers: 1,
            download_timeout: Duration::from_secs(300),
            download_retries: 0,
            extraction_policy: ExtractionPolicy::default(),
            transcode_slots: None,
            transcode_timeout: None,
            scratch_dir: std::env::temp_dir().join("mediafx"),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_clips: std::env::var("MEDIAFX_MAX_CLIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clips),
            max_total_duration_secs: std::env::var("MEDIAFX_MAX_TOTAL_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_total_duration_secs),
            max_active_jobs: std::env::var("MEDIAFX_MAX_ACTIVE_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_active_jobs),
            download_workers: std::env::var("MEDIAFX_DOWNLOAD_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.download_workers),
            download_timeout: Duration::from_secs(
                std::env::var("MEDIAFX_DOWNLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.download_timeout.as_secs()),
            ),
            download_retries: std::env::var("MEDIAFX_DOWNLOAD_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.download_retries),
            extraction_policy: std::env::var("MEDIAFX_EXTRACTION_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.extraction_policy),
            transcode_slots: std::env::var("MEDIAFX_TRANSCODE_SLOTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0),
            transcode_timeout: std::env::var("MEDIAFX_TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
            scratch_dir: std::env::var("MEDIAFX_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        }
    }
}
