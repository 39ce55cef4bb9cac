//! Source acquisition.
//!
//! Fetches each distinct source location referenced by a plan to a
//! workspace-local file, at most once per job. Transfers are streamed to
//! disk chunk by chunk; a source is never buffered whole in memory.
//! Parallelism is bounded by a semaphore sized from configuration, and a
//! per-transfer timeout bounds the wait on a stalled source.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use mediafx_models::ExecutionPlan;

use crate::config::PipelineConfig;
use crate::workspace::Workspace;

/// Fallback extension for sources whose URL does not carry one.
const DEFAULT_SOURCE_EXT: &str = "mp4";

/// Why a source fetch failed.
#[derive(Debug, Error)]
pub enum AcquireCause {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(u16),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A source fetch failure, carrying the offending location.
#[derive(Debug, Error)]
#[error("{location}: {cause}")]
pub struct AcquireError {
    pub location: String,
    #[source]
    pub cause: AcquireCause,
}

/// Fetches the distinct sources of one plan into its workspace.
#[derive(Debug, Clone)]
pub struct SourceAcquirer {
    client: reqwest::Client,
    workers: usize,
    retries: u32,
}

impl SourceAcquirer {
    /// Build an acquirer from pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            workers: config.download_workers.max(1),
            retries: config.download_retries,
        }
    }

    /// Fetch every distinct source location in `plan` into `workspace`.
    ///
    /// Returns a map from location to local path. Any single failure aborts
    /// the whole step; files already written are reclaimed with the
    /// workspace by the caller's failure path.
    pub async fn acquire(
        &self,
        plan: &ExecutionPlan,
        workspace: &Workspace,
    ) -> Result<HashMap<String, PathBuf>, AcquireError> {
        let locations = plan.distinct_locations();
        info!(
            sources = locations.len(),
            clips = plan.len(),
            workers = self.workers,
            "Acquiring sources"
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let fetches = locations.iter().enumerate().map(|(index, location)| {
            let semaphore = Arc::clone(&semaphore);
            let location = location.to_string();
            let dest = workspace.join(format!(
                "source_{:02}.{}",
                index,
                source_extension(&location)
            ));
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("acquisition semaphore closed");
                self.fetch_with_retry(&location, &dest).await?;
                Ok::<_, AcquireError>((location, dest))
            }
        });

        let fetched = try_join_all(fetches).await?;
        Ok(fetched.into_iter().collect())
    }

    async fn fetch_with_retry(&self, location: &str, dest: &PathBuf) -> Result<(), AcquireError> {
        let mut attempt = 0;
        loop {
            match self.fetch(location, dest).await {
                Ok(()) => return Ok(()),
                Err(cause) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        location,
                        attempt,
                        retries = self.retries,
                        error = %cause,
                        "Fetch failed, retrying"
                    );
                }
                Err(cause) => {
                    return Err(AcquireError {
                        location: location.to_string(),
                        cause,
                    })
                }
            }
        }
    }

    /// One streamed transfer. Each attempt restarts from offset zero; the
    /// destination is truncated on open.
    async fn fetch(&self, location: &str, dest: &PathBuf) -> Result<(), AcquireCause> {
        debug!(location, dest = %dest.display(), "Fetching source");

        let response = self.client.get(location).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquireCause::Status(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let data = chunk?;
            file.write_all(&data).await?;
            written += data.len() as u64;
        }
        file.flush().await?;

        info!(location, bytes = written, "Fetched source");
        Ok(())
    }
}

/// Derive a file extension from a URL path, defaulting when absent.
fn source_extension(location: &str) -> &str {
    let path = location
        .split(['?', '#'])
        .next()
        .unwrap_or(location)
        .rsplit('/')
        .next()
        .unwrap_or("");
    match path.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=4).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => DEFAULT_SOURCE_EXT,
    }
}
