//! Shared data models for the MediaFX montage service.
//!
//! This crate provides the types exchanged between the transport layer and
//! the pipeline:
//! - Raw clip submissions and the normalized execution plan
//! - Job identifiers and the job status state machine
//! - Admission rejection reasons with stable reason codes
//! - Extraction policy and the uniform encoding profile

pub mod admission;
pub mod encoding;
pub mod job;
pub mod plan;

// Re-export common types
pub use admission::AdmissionError;
pub use encoding::{EncodingConfig, ExtractionPolicy};
pub use job::{DeliveryState, JobId, JobStatus};
pub use plan::{ClipRequest, ExecutionPlan, RawClip};
