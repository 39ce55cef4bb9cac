//! Clip submissions and plan normalization.
//!
//! A submission is an ordered list of [`RawClip`] entries. Normalization
//! turns that list into an [`ExecutionPlan`]: offsets are coerced into
//! `>= 0` seconds, entries with a missing location or a non-finite or
//! non-positive duration are dropped, and each surviving entry is stamped
//! with its original array position as `sequence_index`. The plan is
//! immutable from that point on.

use serde::{Deserialize, Serialize};

/// One clip entry as submitted by a client, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClip {
    /// Remote source location (HTTP URL). Entries without one are dropped
    /// during normalization.
    #[serde(default)]
    pub url: Option<String>,

    /// Start offset in seconds. Missing means the start of the source.
    #[serde(default)]
    pub start: Option<f64>,

    /// Segment duration in seconds. Missing or non-positive entries are
    /// dropped during normalization.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// One validated request to extract a bounded time range from one source.
///
/// Immutable once the owning job is admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRequest {
    /// Remote source location.
    pub source_location: String,

    /// Start offset in seconds, always `>= 0`.
    pub start_offset: f64,

    /// Duration in seconds, always `> 0` and finite.
    pub duration: f64,

    /// Position of this entry in the raw submission. Fixes output order;
    /// gaps appear where invalid entries were dropped.
    pub sequence_index: usize,
}

/// The normalized, validated, ordered sequence of clip requests for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    clips: Vec<ClipRequest>,
}

impl ExecutionPlan {
    /// Normalize a raw submission into an execution plan.
    ///
    /// Entries with an empty location or a missing, non-finite, or
    /// non-positive duration are dropped silently. Offsets are clamped to
    /// `>= 0`. `sequence_index` is the entry's position in `raw`.
    pub fn normalize(raw: &[RawClip]) -> Self {
        let clips = raw
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let location = entry.url.as_deref().map(str::trim).unwrap_or("");
                if location.is_empty() {
                    return None;
                }
                let duration = entry.duration.unwrap_or(f64::NAN);
                if !duration.is_finite() || duration <= 0.0 {
                    return None;
                }
                let start = entry.start.unwrap_or(0.0);
                let start_offset = if start.is_finite() { start.max(0.0) } else { 0.0 };
                Some(ClipRequest {
                    source_location: location.to_string(),
                    start_offset,
                    duration,
                    sequence_index: index,
                })
            })
            .collect();
        Self { clips }
    }

    /// Clip requests in ascending `sequence_index` order.
    pub fn clips(&self) -> &[ClipRequest] {
        &self.clips
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Sum of all clip durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.duration).sum()
    }

    /// Distinct source locations, in first-reference order.
    pub fn distinct_locations(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.clips
            .iter()
            .map(|c| c.source_location.as_str())
            .filter(|loc| seen.insert(*loc))
            .collect()
    }
}
