//! Pipeline error types.
//!
//! Stage errors are captured into the owning job's `error_detail` and
//! surfaced only through status polling; the first failure halts the
//! remaining stages.

use thiserror::Error;

use mediafx_media::MediaError;

use crate::acquire::AcquireError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A failure in one stage of a job's background execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source acquisition failed; carries the offending location.
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquireError),

    /// Segment extraction failed for the clip at `sequence_index`.
    #[error("extraction failed for clip {sequence_index}: {source}")]
    Extraction {
        sequence_index: usize,
        #[source]
        source: MediaError,
    },

    /// Final assembly failed.
    #[error("concatenation failed: {source}")]
    Concatenation {
        #[source]
        source: MediaError,
    },
}

impl PipelineError {
    pub fn extraction(sequence_index: usize, source: MediaError) -> Self {
        Self::Extraction {
            sequence_index,
            source,
        }
    }

    pub fn concatenation(source: MediaError) -> Self {
        Self::Concatenation { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_detail_names_sequence_index() {
        let err = PipelineError::extraction(
            1,
            MediaError::ffmpeg_failed("FFmpeg exited with status 187", None, Some(187)),
        );
        let detail = err.to_string();
        assert!(detail.contains("clip 1"));
        assert!(detail.contains("187"));
    }
}
