//! The transcode engine seam.
//!
//! The pipeline drives the engine through [`TranscodeEngine`] so tests can
//! substitute a stub; [`FfmpegEngine`] is the production implementation.

use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use tracing::info;

use mediafx_models::{EncodingConfig, ExtractionPolicy};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// An invocable transcode engine: one operation that materializes a segment
/// covering `[start_offset, start_offset + duration)` of a source, and one
/// that concatenates an ordered manifest of segments into a single artifact.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Produce a segment artifact at `output`.
    async fn extract(
        &self,
        source: &Path,
        start_offset: f64,
        duration: f64,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> MediaResult<()>;

    /// Concatenate the segments referenced by `manifest` into `output`.
    ///
    /// Under [`ExtractionPolicy::Normalize`] every segment shares one codec
    /// profile, which is what makes the stream-copy fast path valid; under
    /// [`ExtractionPolicy::Copy`] the segments are re-encoded while joining.
    async fn concatenate(
        &self,
        manifest: &Path,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> MediaResult<()>;
}

/// FFmpeg-backed transcode engine.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    timeout: Option<Duration>,
}

impl FfmpegEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific encoding profile for the Normalize policy.
    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// Bound each engine invocation to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout {
            Some(timeout) => FfmpegRunner::new().with_timeout(timeout),
            None => FfmpegRunner::new(),
        }
    }

    fn build_extract_command(
        &self,
        source: &Path,
        start_offset: f64,
        duration: f64,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(source, output)
            .seek(start_offset)
            .duration(duration);

        match policy {
            ExtractionPolicy::Copy => cmd.codec_copy(),
            ExtractionPolicy::Normalize => cmd
                .video_filter(self.encoding.uniform_scale_filter())
                .output_args(self.encoding.to_ffmpeg_args()),
        }
    }

    fn build_concat_command(
        &self,
        manifest: &Path,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(manifest, output).input_args(["-f", "concat", "-safe", "0"]);

        match policy {
            // Normalized segments share one profile; a stream copy is valid.
            ExtractionPolicy::Normalize => cmd.codec_copy(),
            // Copy-policy segments may differ per source; join by re-encoding
            // to the uniform profile.
            ExtractionPolicy::Copy => cmd
                .video_filter(self.encoding.uniform_scale_filter())
                .output_args(self.encoding.to_ffmpeg_args()),
        }
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn extract(
        &self,
        source: &Path,
        start_offset: f64,
        duration: f64,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> MediaResult<()> {
        info!(
            source = %source.display(),
            output = %output.display(),
            start_offset,
            duration,
            policy = %policy,
            "Extracting segment"
        );

        let cmd = self.build_extract_command(source, start_offset, duration, output, policy);
        self.runner().run(&cmd).await
    }

    async fn concatenate(
        &self,
        manifest: &Path,
        output: &Path,
        policy: ExtractionPolicy,
    ) -> MediaResult<()> {
        info!(
            manifest = %manifest.display(),
            output = %output.display(),
            policy = %policy,
            "Concatenating segments"
        );

        let cmd = self.build_concat_command(manifest, output, policy);
        self.runner().run(&cmd).await
    }
}
