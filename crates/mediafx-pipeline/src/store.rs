//! The job table.
//!
//! Jobs live behind an explicit store abstraction so the manager's logic is
//! independent of the storage choice. The in-memory implementation guards
//! the table with one mutex; that single primitive serializes submission,
//! status polling, and background-completion updates.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use mediafx_models::{DeliveryState, ExecutionPlan, JobId, JobStatus};

use crate::workspace::Workspace;

/// One submission's end-to-end lifecycle record.
///
/// Owned exclusively by the job manager; other components receive clones
/// and never mutate it.
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque unique handle
    pub id: JobId,
    /// Current status; transitions are monotonic
    pub status: JobStatus,
    /// The normalized plan, immutable after admission
    pub plan: ExecutionPlan,
    /// The failing stage's message, set when status is Failed
    pub error_detail: Option<String>,
    /// Final artifact path, set when status is Done
    pub artifact: Option<PathBuf>,
    /// Single-use delivery lifecycle of the artifact
    pub delivery: DeliveryState,
    /// Private scratch directory
    pub workspace: Workspace,
    /// Admission timestamp
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly admitted job in `Queued`.
    pub fn new(plan: ExecutionPlan, workspace: Workspace) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            plan,
            error_detail: None,
            artifact: None,
            delivery: DeliveryState::NotReady,
            workspace,
            created_at: Utc::now(),
        }
    }
}

/// Storage abstraction for the job table.
///
/// `insert_bounded` exists so the admission ceiling check and the insert
/// are one atomic operation; a transactional backend would implement it the
/// same way.
pub trait JobStore: Send + Sync + 'static {
    /// Insert `job` unless the number of non-terminal jobs has reached
    /// `max_active`. Returns the active count on rejection.
    fn insert_bounded(&self, job: Job, max_active: usize) -> Result<(), usize>;

    /// Snapshot of one job.
    fn get(&self, id: &JobId) -> Option<Job>;

    /// Snapshot of every job.
    fn list(&self) -> Vec<Job>;

    /// Apply `apply` to one job under the store lock and return the updated
    /// snapshot.
    fn update(&self, id: &JobId, apply: &mut dyn FnMut(&mut Job)) -> Option<Job>;
}

/// In-memory job table guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn insert_bounded(&self, job: Job, max_active: usize) -> Result<(), usize> {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        let active = jobs.values().filter(|j| !j.status.is_terminal()).count();
        if active >= max_active {
            return Err(active);
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().expect("job table poisoned").get(id).cloned()
    }

    fn list(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .expect("job table poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn update(&self, id: &JobId, apply: &mut dyn FnMut(&mut Job)) -> Option<Job> {
        let mut jobs = self.jobs.lock().expect("job table poisoned");
        let job = jobs.get_mut(id)?;
        apply(job);
        Some(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediafx_models::RawClip;
    use tempfile::TempDir;

    fn sample_job(scratch: &TempDir) -> Job {
        let plan = ExecutionPlan::normalize(&[RawClip {
            url: Some("https://cdn.example.com/a.mp4".to_string()),
            start: Some(0.0),
            duration: Some(2.0),
        }]);
        let workspace = Workspace::create(scratch.path()).unwrap();
        Job::new(plan, workspace)
    }

    #[test]
    fn test_insert_and_get() {
        let scratch = TempDir::new().unwrap();
        let store = MemoryJobStore::new();
        let job = sample_job(&scratch);
        let id = job.id.clone();

        store.insert_bounded(job, 2).unwrap();

        let fetched = store.get(&id).unwrap();
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.delivery, DeliveryState::NotReady);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let store = MemoryJobStore::new();
        assert!(store.get(&JobId::new()).is_none());
    }

    #[test]
    fn test_insert_bounded_enforces_ceiling() {
        let scratch = TempDir::new().unwrap();
        let store = MemoryJobStore::new();

        store.insert_bounded(sample_job(&scratch), 1).unwrap();
        let rejected = store.insert_bounded(sample_job(&scratch), 1);

        assert_eq!(rejected, Err(1));
    }

    #[test]
    fn test_terminal_jobs_free_capacity() {
        let scratch = TempDir::new().unwrap();
        let store = MemoryJobStore::new();
        let first = sample_job(&scratch);
        let first_id = first.id.clone();
        store.insert_bounded(first, 1).unwrap();

        store.update(&first_id, &mut |j| {
            j.status = JobStatus::Processing;
        });
        store.update(&first_id, &mut |j| {
            j.status = JobStatus::Failed;
            j.error_detail = Some("boom".to_string());
        });

        store.insert_bounded(sample_job(&scratch), 1).unwrap();
    }

    #[test]
    fn test_update_returns_snapshot() {
        let scratch = TempDir::new().unwrap();
        let store = MemoryJobStore::new();
        let job = sample_job(&scratch);
        let id = job.id.clone();
        store.insert_bounded(job, 2).unwrap();

        let updated = store
            .update(&id, &mut |j| {
                j.status = JobStatus::Processing;
            })
            .unwrap();

        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Processing);
    }
}
