//! The job manager.
//!
//! Validates and admits submissions, runs the acquisition -> extraction ->
//! concatenation pipeline as one linear background task per job, tracks
//! status, and serves the final artifact exactly once.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use mediafx_media::{concat, probe, TranscodeEngine};
use mediafx_models::{AdmissionError, DeliveryState, ExecutionPlan, JobId, JobStatus, RawClip};

use crate::acquire::SourceAcquirer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::store::{Job, JobStore, MemoryJobStore};
use crate::workspace::Workspace;

/// File name of the concat manifest inside a workspace.
const MANIFEST_NAME: &str = "concat.txt";

/// File name of the final artifact inside a workspace.
const ARTIFACT_NAME: &str = "montage.mp4";

/// Why a submission could not produce a job.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Structured rejection; no job was created.
    #[error(transparent)]
    Rejected(#[from] AdmissionError),

    /// Workspace allocation failed.
    #[error("failed to allocate workspace: {0}")]
    Workspace(#[from] std::io::Error),
}

/// Why a status or result lookup failed.
#[derive(Debug, Error)]
pub enum JobQueryError {
    #[error("job not found")]
    NotFound,

    /// The job has not produced a deliverable artifact.
    #[error("job is not done (status: {0})")]
    NotReady(JobStatus),

    /// The artifact was already delivered and reclaimed.
    #[error("result already delivered")]
    Gone,
}

/// Point-in-time view of one job for status polling.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A claimed result: the artifact path plus the guard whose drop reclaims
/// the workspace. Keep the guard alive for as long as the artifact is being
/// read; dropping it (on stream completion or failure) finalizes delivery.
pub struct ResultHandle {
    pub path: PathBuf,
    pub guard: DeliveryGuard,
}

/// Finalizes a single-use delivery exactly once, on drop.
pub struct DeliveryGuard {
    id: JobId,
    store: Arc<dyn JobStore>,
    workspace: Workspace,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        debug!(job_id = %self.id, "Finalizing result delivery");
        self.store.update(&self.id, &mut |job| {
            job.delivery = DeliveryState::Reclaimed;
            job.artifact = None;
        });
        self.workspace.destroy_blocking();
    }
}

/// The state machine and admission-control gate over the pipeline.
pub struct JobManager {
    store: Arc<dyn JobStore>,
    config: PipelineConfig,
    acquirer: SourceAcquirer,
    engine: Arc<dyn TranscodeEngine>,
    /// Optional process-wide cap on concurrent transcode invocations.
    transcode_gate: Option<Arc<Semaphore>>,
}

impl JobManager {
    /// Create a manager with an in-memory job table.
    pub fn new(config: PipelineConfig, engine: Arc<dyn TranscodeEngine>) -> Arc<Self> {
        let acquirer = SourceAcquirer::new(&config);
        let transcode_gate = config
            .transcode_slots
            .map(|slots| Arc::new(Semaphore::new(slots)));
        Arc::new(Self {
            store: Arc::new(MemoryJobStore::new()),
            config,
            acquirer,
            engine,
            transcode_gate,
        })
    }

    /// Validate and admit a raw submission.
    ///
    /// Never blocks on pipeline work: on acceptance the job is inserted in
    /// `Queued` and its pipeline is scheduled onto a background task.
    pub fn submit(self: &Arc<Self>, raw: &[RawClip]) -> Result<JobId, SubmitError> {
        let plan = ExecutionPlan::normalize(raw);

        if plan.is_empty() {
            return Err(AdmissionError::EmptyPlan.into());
        }
        if plan.len() > self.config.max_clips {
            return Err(AdmissionError::TooManyClips {
                count: plan.len(),
                max: self.config.max_clips,
            }
            .into());
        }
        let total = plan.total_duration();
        if total > self.config.max_total_duration_secs {
            return Err(AdmissionError::TotalDurationExceeded {
                total,
                max: self.config.max_total_duration_secs,
            }
            .into());
        }

        let workspace = Workspace::create(&self.config.scratch_dir)?;
        let job = Job::new(plan, workspace.clone());
        let id = job.id.clone();

        if let Err(active) = self.store.insert_bounded(job, self.config.max_active_jobs) {
            workspace.destroy_blocking();
            return Err(AdmissionError::AtCapacity {
                active,
                max: self.config.max_active_jobs,
            }
            .into());
        }

        info!(job_id = %id, "Job admitted");

        let manager = Arc::clone(self);
        let job_id = id.clone();
        tokio::spawn(async move {
            manager.run_job(job_id).await;
        });

        Ok(id)
    }

    /// Current status of a job.
    pub fn status(&self, id: &JobId) -> Result<StatusSnapshot, JobQueryError> {
        let job = self.store.get(id).ok_or(JobQueryError::NotFound)?;
        Ok(StatusSnapshot {
            id: job.id,
            status: job.status,
            error_detail: job.error_detail,
            created_at: job.created_at,
        })
    }

    /// Claim the result of a finished job for single-use delivery.
    ///
    /// The claim is atomic under the store lock: exactly one caller may
    /// consume the artifact; concurrent callers observe `Gone` (already
    /// claimed or reclaimed) or `NotReady` (not yet Done).
    pub fn open_result(&self, id: &JobId) -> Result<ResultHandle, JobQueryError> {
        let mut claimed = false;
        let job = self
            .store
            .update(id, &mut |job| {
                if job.status == JobStatus::Done && job.delivery == DeliveryState::Available {
                    job.delivery = DeliveryState::InFlight;
                    claimed = true;
                }
            })
            .ok_or(JobQueryError::NotFound)?;

        if !claimed {
            return Err(match job.status {
                JobStatus::Done => JobQueryError::Gone,
                status => JobQueryError::NotReady(status),
            });
        }

        let path = job
            .artifact
            .expect("done job without artifact path");
        Ok(ResultHandle {
            path,
            guard: DeliveryGuard {
                id: id.clone(),
                store: Arc::clone(&self.store),
                workspace: job.workspace,
            },
        })
    }

    /// Drive one admitted job from Queued to a terminal state.
    async fn run_job(&self, id: JobId) {
        let Some(job) = self.store.update(&id, &mut |job| {
            if job.status.can_transition_to(JobStatus::Processing) {
                job.status = JobStatus::Processing;
            }
        }) else {
            return;
        };
        if job.status != JobStatus::Processing {
            return;
        }

        info!(
            job_id = %id,
            clips = job.plan.len(),
            sources = job.plan.distinct_locations().len(),
            "Job started"
        );

        match self.execute(&job).await {
            Ok(artifact) => {
                self.store.update(&id, &mut |job| {
                    job.status = JobStatus::Done;
                    job.artifact = Some(artifact.clone());
                    job.delivery = DeliveryState::Available;
                });
                info!(job_id = %id, artifact = %artifact.display(), "Job done");
            }
            Err(err) => {
                warn!(job_id = %id, error = %err, "Job failed");
                // Partial artifacts are reclaimed now, not at result retrieval.
                job.workspace.destroy().await;
                self.store.update(&id, &mut |job| {
                    job.status = JobStatus::Failed;
                    job.error_detail = Some(err.to_string());
                });
            }
        }
    }

    /// The linear pipeline: acquire, extract per clip in sequence order,
    /// concatenate. Each stage short-circuits the rest on error.
    async fn execute(&self, job: &Job) -> PipelineResult<PathBuf> {
        let policy = self.config.extraction_policy;

        let sources = self.acquirer.acquire(&job.plan, &job.workspace).await?;

        let mut segments = Vec::with_capacity(job.plan.len());
        for clip in job.plan.clips() {
            let source = sources
                .get(&clip.source_location)
                .expect("acquired source missing for plan location");
            let segment = job
                .workspace
                .join(format!("segment_{:04}.mp4", clip.sequence_index));

            let _slot = self.transcode_slot().await;
            self.engine
                .extract(source, clip.start_offset, clip.duration, &segment, policy)
                .await
                .map_err(|source| PipelineError::extraction(clip.sequence_index, source))?;
            segments.push(segment);
        }

        let manifest = concat::write_manifest(&segments, job.workspace.join(MANIFEST_NAME))
            .await
            .map_err(PipelineError::concatenation)?;
        let artifact = job.workspace.join(ARTIFACT_NAME);
        {
            let _slot = self.transcode_slot().await;
            self.engine
                .concatenate(&manifest, &artifact, policy)
                .await
                .map_err(PipelineError::concatenation)?;
        }

        match probe::probe_duration(&artifact).await {
            Ok(duration) => info!(
                job_id = %job.id,
                duration_secs = duration,
                segments = segments.len(),
                "Final artifact assembled"
            ),
            Err(e) => debug!(job_id = %job.id, error = %e, "Skipping artifact probe"),
        }

        Ok(artifact)
    }

    async fn transcode_slot(&self) -> Option<tokio::sync::OwnedSemaphorePermit> {
        match &self.transcode_gate {
            Some(gate) => Some(
                Arc::clone(gate)
                    .acquire_owned()
                    .await
                    .expect("transcode gate closed"),
            ),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mediafx_media::{MediaError, MediaResult};
    use mediafx_models::ExtractionPolicy;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Transcode engine stub: records calls and writes marker files.
    #[derive(Default)]
    struct StubEngine {
        extract_calls: Mutex<Vec<(f64, PathBuf)>>,
        concat_calls: Mutex<Vec<PathBuf>>,
        fail_on_extract: Option<usize>,
        delay: Option<Duration>,
    }

    impl StubEngine {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_extract: Some(call),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn extract_starts(&self) -> Vec<f64> {
            self.extract_calls.lock().unwrap().iter().map(|c| c.0).collect()
        }

        fn concat_count(&self) -> usize {
            self.concat_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TranscodeEngine for StubEngine {
        async fn extract(
            &self,
            _source: &Path,
            start_offset: f64,
            _duration: f64,
            output: &Path,
            _policy: ExtractionPolicy,
        ) -> MediaResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let call = {
                let mut calls = self.extract_calls.lock().unwrap();
                calls.push((start_offset, output.to_path_buf()));
                calls.len() - 1
            };
            if self.fail_on_extract == Some(call) {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with status 1",
                    Some("stub failure".to_string()),
                    Some(1),
                ));
            }
            tokio::fs::write(output, format!("segment@{start_offset}")).await?;
            Ok(())
        }

        async fn concatenate(
            &self,
            manifest: &Path,
            output: &Path,
            _policy: ExtractionPolicy,
        ) -> MediaResult<()> {
            self.concat_calls.lock().unwrap().push(manifest.to_path_buf());
            let listing = tokio::fs::read_to_string(manifest).await?;
            tokio::fs::write(output, listing).await?;
            Ok(())
        }
    }

    fn clip(url: &str, start: f64, duration: f64) -> RawClip {
        RawClip {
            url: Some(url.to_string()),
            start: Some(start),
            duration: Some(duration),
        }
    }

    fn manager_with(
        scratch: &TempDir,
        engine: Arc<StubEngine>,
        tweak: impl FnOnce(&mut PipelineConfig),
    ) -> Arc<JobManager> {
        let mut config = PipelineConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        tweak(&mut config);
        JobManager::new(config, engine)
    }

    async fn serve_source(server: &MockServer, route: &str) {
        Mock::given(method("GET"))
            .and(url_path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media-bytes".to_vec()))
            .mount(server)
            .await;
    }

    async fn wait_terminal(manager: &JobManager, id: &JobId) -> StatusSnapshot {
        for _ in 0..1000 {
            let snapshot = manager.status(id).unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_same_source_montage_fetches_once_and_orders_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/a.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"media-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let scratch = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::default());
        let manager = manager_with(&scratch, Arc::clone(&engine), |_| {});

        let url = format!("{}/a.mp4", server.uri());
        let id = manager
            .submit(&[clip(&url, 0.0, 2.0), clip(&url, 5.0, 2.0), clip(&url, 10.0, 2.0)])
            .unwrap();

        let snapshot = wait_terminal(&manager, &id).await;
        assert_eq!(snapshot.status, JobStatus::Done);
        assert_eq!(engine.extract_starts(), vec![0.0, 5.0, 10.0]);
        assert_eq!(engine.concat_count(), 1);
        server.verify().await;

        // The stub copies the manifest into the artifact: segment order is
        // ascending sequence index.
        let handle = manager.open_result(&id).unwrap();
        let listing = std::fs::read_to_string(&handle.path).unwrap();
        let p0 = listing.find("segment_0000").unwrap();
        let p1 = listing.find("segment_0001").unwrap();
        let p2 = listing.find("segment_0002").unwrap();
        assert!(p0 < p1 && p1 < p2);
    }

    #[tokio::test]
    async fn test_empty_plan_is_rejected_without_creating_a_job() {
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(&scratch, Arc::new(StubEngine::default()), |_| {});

        let err = manager.submit(&[]).unwrap_err();

        assert!(matches!(
            err,
            SubmitError::Rejected(AdmissionError::EmptyPlan)
        ));
        assert!(manager.store.list().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entry_is_dropped_and_job_succeeds() {
        let server = MockServer::start().await;
        serve_source(&server, "/b.mp4").await;
        let scratch = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::default());
        let manager = manager_with(&scratch, Arc::clone(&engine), |_| {});

        let url = format!("{}/b.mp4", server.uri());
        let id = manager
            .submit(&[clip(&url, 0.0, -1.0), clip(&url, 3.0, 4.0)])
            .unwrap();

        let snapshot = wait_terminal(&manager, &id).await;
        assert_eq!(snapshot.status, JobStatus::Done);
        // Only the valid entry ran, keeping its raw position.
        assert_eq!(engine.extract_starts(), vec![3.0]);
        let outputs: Vec<PathBuf> = engine
            .extract_calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.1.clone())
            .collect();
        assert!(outputs[0].ends_with("segment_0001.mp4"));
    }

    #[tokio::test]
    async fn test_total_duration_ceiling_rejects() {
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(&scratch, Arc::new(StubEngine::default()), |c| {
            c.max_total_duration_secs = 60.0;
        });

        let clips: Vec<RawClip> = (0..5)
            .map(|i| clip(&format!("https://cdn.example.com/{i}.mp4"), 0.0, 20.0))
            .collect();
        let err = manager.submit(&clips).unwrap_err();

        match err {
            SubmitError::Rejected(rejection @ AdmissionError::TotalDurationExceeded { .. }) => {
                assert_eq!(rejection.code(), "total_duration_exceeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_clip_count_ceiling_rejects() {
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(&scratch, Arc::new(StubEngine::default()), |c| {
            c.max_clips = 20;
            c.max_total_duration_secs = 1e9;
        });

        let clips: Vec<RawClip> = (0..21)
            .map(|i| clip(&format!("https://cdn.example.com/{i}.mp4"), 0.0, 1.0))
            .collect();
        let err = manager.submit(&clips).unwrap_err();

        match err {
            SubmitError::Rejected(rejection @ AdmissionError::TooManyClips { .. }) => {
                assert_eq!(rejection.code(), "too_many_clips");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_fails_job_and_cleans_workspace() {
        let server = MockServer::start().await;
        serve_source(&server, "/a.mp4").await;
        let scratch = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::failing_on(1));
        let manager = manager_with(&scratch, Arc::clone(&engine), |_| {});

        let url = format!("{}/a.mp4", server.uri());
        let id = manager
            .submit(&[clip(&url, 0.0, 2.0), clip(&url, 5.0, 2.0), clip(&url, 10.0, 2.0)])
            .unwrap();

        let snapshot = wait_terminal(&manager, &id).await;
        assert_eq!(snapshot.status, JobStatus::Failed);
        let detail = snapshot.error_detail.unwrap();
        assert!(detail.contains("clip 1"), "detail: {detail}");

        // No concatenation was attempted and the workspace is gone.
        assert_eq!(engine.concat_count(), 0);
        let job = manager.store.get(&id).unwrap();
        assert!(!job.workspace.path().exists());

        // A failed job has no result.
        assert!(matches!(
            manager.open_result(&id),
            Err(JobQueryError::NotReady(JobStatus::Failed))
        ));
    }

    #[tokio::test]
    async fn test_acquisition_failure_fails_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/gone.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let scratch = TempDir::new().unwrap();
        let engine = Arc::new(StubEngine::default());
        let manager = manager_with(&scratch, Arc::clone(&engine), |_| {});

        let url = format!("{}/gone.mp4", server.uri());
        let id = manager.submit(&[clip(&url, 0.0, 2.0)]).unwrap();

        let snapshot = wait_terminal(&manager, &id).await;
        assert_eq!(snapshot.status, JobStatus::Failed);
        let detail = snapshot.error_detail.unwrap();
        assert!(detail.contains("404"), "detail: {detail}");
        assert!(detail.contains(&url), "detail: {detail}");
        assert!(engine.extract_starts().is_empty());
    }

    #[tokio::test]
    async fn test_result_delivery_is_single_use() {
        let server = MockServer::start().await;
        serve_source(&server, "/a.mp4").await;
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(&scratch, Arc::new(StubEngine::default()), |_| {});

        let url = format!("{}/a.mp4", server.uri());
        let id = manager.submit(&[clip(&url, 0.0, 2.0)]).unwrap();
        wait_terminal(&manager, &id).await;

        let handle = manager.open_result(&id).unwrap();
        let workspace_path = handle.path.parent().unwrap().to_path_buf();
        assert!(workspace_path.exists());

        // A second claim while the first is in flight observes Gone.
        assert!(matches!(manager.open_result(&id), Err(JobQueryError::Gone)));

        // Completing delivery reclaims the workspace.
        drop(handle);
        assert!(!workspace_path.exists());
        assert!(matches!(manager.open_result(&id), Err(JobQueryError::Gone)));

        // Status stays Done after delivery.
        assert_eq!(manager.status(&id).unwrap().status, JobStatus::Done);
    }

    #[tokio::test]
    async fn test_result_before_done_is_not_ready() {
        let server = MockServer::start().await;
        serve_source(&server, "/a.mp4").await;
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(
            &scratch,
            Arc::new(StubEngine::slow(Duration::from_secs(30))),
            |_| {},
        );

        let url = format!("{}/a.mp4", server.uri());
        let id = manager.submit(&[clip(&url, 0.0, 2.0)]).unwrap();

        assert!(matches!(
            manager.open_result(&id),
            Err(JobQueryError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(&scratch, Arc::new(StubEngine::default()), |_| {});

        let id = JobId::new();
        assert!(matches!(manager.status(&id), Err(JobQueryError::NotFound)));
        assert!(matches!(
            manager.open_result(&id),
            Err(JobQueryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_capacity_ceiling_rejects_while_processing() {
        let server = MockServer::start().await;
        serve_source(&server, "/a.mp4").await;
        let scratch = TempDir::new().unwrap();
        let manager = manager_with(
            &scratch,
            Arc::new(StubEngine::slow(Duration::from_secs(30))),
            |c| c.max_active_jobs = 1,
        );

        let url = format!("{}/a.mp4", server.uri());
        manager.submit(&[clip(&url, 0.0, 2.0)]).unwrap();
        let err = manager.submit(&[clip(&url, 0.0, 2.0)]).unwrap_err();

        match err {
            SubmitError::Rejected(rejection @ AdmissionError::AtCapacity { .. }) => {
                assert_eq!(rejection.code(), "at_capacity");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
