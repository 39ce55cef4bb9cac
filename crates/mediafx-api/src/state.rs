//! Application state.

use std::sync::Arc;

use mediafx_media::FfmpegEngine;
use mediafx_pipeline::{JobManager, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub manager: Arc<JobManager>,
}

impl AppState {
    /// Create application state with an FFmpeg-backed pipeline.
    pub fn new(config: ApiConfig, pipeline: PipelineConfig) -> Self {
        let mut engine = FfmpegEngine::new();
        if let Some(timeout) = pipeline.transcode_timeout {
            engine = engine.with_timeout(timeout);
        }
        let manager = JobManager::new(pipeline, Arc::new(engine));
        Self { config, manager }
    }
}
