//! Error types for media-dl
//!
//! This module provides the error taxonomy for the library:
//! - Resolution errors (`InvalidSource`, `StreamUnavailable`)
//! - Transport errors (`Network`, `Io`)
//! - External engine errors (`TranscodeError` with spawn/exit detail)
//! - Tagging errors, split into the fatal write failure (`Tag`) and the
//!   non-fatal degradations (`MetadataDegraded`) that never fail a job
//! - A `Stage` wrapper attached at the pipeline boundary so callers can see
//!   which stage of a job failed

use crate::types::JobStage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// The media identifier could not be resolved to any media item
    #[error("invalid source '{identifier}': {reason}")]
    InvalidSource {
        /// The identifier that failed to resolve
        identifier: String,
        /// Why resolution failed
        reason: String,
    },

    /// The requested stream descriptor does not match any available encoding
    #[error("stream unavailable: {0}")]
    StreamUnavailable(String),

    /// Network error (transient; callers may retry the job with the same arguments)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External transcode engine failed
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Tag write failed on the target file (fatal to the job)
    #[error("tag write failed on {path}: {reason}")]
    Tag {
        /// The file that could not be tagged
        path: PathBuf,
        /// Underlying tag library error
        reason: String,
    },

    /// Cover fetch or MIME detection failed (non-fatal; tagging continues without cover)
    #[error("metadata degraded: {0}")]
    MetadataDegraded(String),

    /// Temp or destination filesystem failure (fatal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed; wraps the underlying error with the stage it occurred in
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// The pipeline stage that was active when the error occurred
        stage: JobStage,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error with the pipeline stage it occurred in.
    ///
    /// Already-wrapped errors are returned unchanged so the innermost stage
    /// annotation wins.
    pub fn at_stage(stage: JobStage, error: Error) -> Error {
        match error {
            e @ Error::Stage { .. } => e,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The pipeline stage this error occurred in, if known
    pub fn failing_stage(&self) -> Option<JobStage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, unwrapping any stage annotation
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors from the external transcode engine
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// No usable ffmpeg binary was found in PATH or configuration
    #[error("ffmpeg binary not found in PATH (install ffmpeg or set an explicit path)")]
    BinaryNotFound,

    /// The engine process could not be started
    #[error("failed to spawn {binary}: {reason}")]
    Spawn {
        /// Path to the binary that failed to start
        binary: PathBuf,
        /// OS-level spawn error
        reason: String,
    },

    /// The engine exited with a non-zero status
    #[error("engine exited with status {code:?}: {stderr}")]
    Engine {
        /// Process exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Tail of the engine's stderr output
        stderr: String,
    },

    /// The engine reported success but produced no usable output file
    #[error("engine produced missing or empty output: {0}")]
    EmptyOutput(PathBuf),
}
