//! Job orchestration and media pipeline for MediaFX.
//!
//! One submission becomes one [`Job`](store::Job) that runs a linear
//! background pipeline: acquire each distinct source once, extract one
//! segment per clip in sequence order, concatenate, then serve the artifact
//! exactly once. The job table is the only cross-job shared state; every
//! file a job touches lives in its private [`Workspace`](workspace::Workspace).

pub mod acquire;
pub mod config;
pub mod error;
pub mod manager;
pub mod store;
pub mod workspace;

pub use acquire::{AcquireError, SourceAcquirer};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use manager::{DeliveryGuard, JobManager, JobQueryError, ResultHandle, StatusSnapshot, SubmitError};
pub use store::{Job, JobStore, MemoryJobStore};
pub use workspace::Workspace;
