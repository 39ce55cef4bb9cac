//! Request handlers.

pub mod health;
pub mod jobs;
pub mod montage;

pub use health::health;
pub use jobs::{get_job_result, get_job_status};
pub use montage::{submit_montage, trim_echo};
