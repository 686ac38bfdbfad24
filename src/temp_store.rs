//! Scratch file management for raw, not-yet-finalized streams
//!
//! Every path handed out by [`TempStore::allocate`] must be passed to
//! [`TempStore::release`] once its consumer has finished with it, on both the
//! success and the failure path. This is the primary leak-prevention
//! invariant of the pipeline. The one deliberate exception: raw inputs of a
//! failed transcode are retained for inspection.

use crate::error::Result;
use crate::types::JobId;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of raw stream held in scratch storage
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempKind {
    /// Raw audio stream, pre-transcode
    AudioRaw,
    /// Raw video stream, pre-merge
    VideoRaw,
}

impl TempKind {
    /// File name suffix for this kind
    pub fn suffix(&self) -> &'static str {
        match self {
            TempKind::AudioRaw => "audio-raw",
            TempKind::VideoRaw => "video-raw",
        }
    }
}

/// Manages scratch files under a single scratch root.
///
/// Paths are deterministic per `(job id, kind)`, so a crashed run's leaked
/// temp files are reclaimed when the same job allocates again.
#[derive(Clone, Debug)]
pub struct TempStore {
    root: PathBuf,
}

impl TempStore {
    /// Create a store rooted at the given scratch directory.
    /// The directory itself is created lazily on first allocation.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate a scratch path for a job and kind.
    ///
    /// Creates the scratch directory if needed and removes any stale file
    /// left at the same path by a previous torn-down run.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the scratch directory cannot be created or
    /// a stale file cannot be removed.
    pub async fn allocate(&self, job: &JobId, kind: TempKind) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.root.join(format!("{job}.{}", kind.suffix()));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale temp file from previous run");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        debug!(job = %job, kind = ?kind, path = %path.display(), "allocated temp path");
        Ok(path)
    }

    /// Release a scratch file. Safe to call on a non-existent path (no-op).
    /// Deletion failures are logged, not surfaced: release runs on failure
    /// paths where the original error must not be masked.
    pub async fn release(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "released temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to release temp file");
            }
        }
    }
}
