//! Per-job scratch workspaces.
//!
//! A workspace is a uniquely named directory owned by exactly one job.
//! Every local file the job touches (downloaded sources, extracted
//! segments, the concat manifest, the final artifact) lives under it.
//! Destruction is recursive, best-effort, and happens at most once no
//! matter how many handles exist.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle to one job's scratch directory. Clones share the
/// destroyed-exactly-once flag.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    destroyed: Arc<AtomicBool>,
}

impl Workspace {
    /// Allocate a new uniquely named workspace under `scratch_root`.
    pub fn create(scratch_root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = scratch_root.as_ref().join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&root)?;
        debug!(workspace = %root.display(), "Created workspace");
        Ok(Self {
            root,
            destroyed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// A path for `name` inside the workspace.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    /// Whether teardown has already run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Recursively remove the workspace. Best-effort: removal errors are
    /// logged and swallowed. Repeat calls are no-ops.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            warn!(
                workspace = %self.root.display(),
                error = %e,
                "Failed to remove workspace"
            );
        } else {
            debug!(workspace = %self.root.display(), "Removed workspace");
        }
    }

    /// Synchronous variant of [`destroy`](Self::destroy), for drop-time
    /// teardown where no executor is guaranteed.
    pub fn destroy_blocking(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            warn!(
                workspace = %self.root.display(),
                error = %e,
                "Failed to remove workspace"
            );
        } else {
            debug!(workspace = %self.root.display(), "Removed workspace");
        }
    }
}
