//! # media-dl
//!
//! Backend library for media download applications: acquires remote
//! audio/video streams, merges separately fetched audio and video tracks,
//! transcodes to a target format via an external ffmpeg process, and embeds
//! ID3 metadata (title, artist, album, cover art) into finished audio files.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Idempotent** - Skip-if-exists semantics; re-running a batch never
//!   redoes completed work
//! - **Event-driven** - Consumers subscribe to progress events, no polling
//! - **Sequential by design** - One job at a time bounds resource usage to
//!   one transcode process and at most two open streams
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, BatchMode};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     resolver: Arc<dyn media_dl::StreamResolver>,
//! #     playlists: Arc<dyn media_dl::PlaylistProvider>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = MediaDownloader::new(Config::default(), resolver, playlists)?;
//!
//! // Subscribe to events
//! let mut events = downloader.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let summary = downloader.run_batch("PLxyz", BatchMode::AudioPlaylist).await?;
//! println!(
//!     "completed {}, skipped {}, failed {}",
//!     summary.completed.len(),
//!     summary.skipped.len(),
//!     summary.failed.len()
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch orchestration across playlist items
pub mod batch;
/// Configuration types
pub mod config;
/// The MediaDownloader facade
pub mod downloader;
/// Error types
pub mod error;
/// Stream fetching into temp storage
pub mod fetcher;
/// Per-job pipeline state machine
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// External collaborator interfaces (stream resolution, playlist listing)
pub mod services;
/// ID3 metadata tagging
pub mod tagger;
/// Scratch file management
pub mod temp_store;
/// External transcode engine
pub mod transcoder;
/// Core types and events
pub mod types;
/// Naming and completeness helpers
pub mod utils;

// Re-export commonly used types
pub use batch::BatchOrchestrator;
pub use config::{Config, DownloadConfig, RetryConfig, TranscodeConfig};
pub use downloader::MediaDownloader;
pub use error::{Error, Result, TranscodeError};
pub use pipeline::{DownloadJob, PipelineRunner, TagContext};
pub use services::{MediaStream, PlaylistProvider, ResolvedMedia, StreamResolver};
pub use tagger::MetadataTagger;
pub use temp_store::{TempKind, TempStore};
pub use transcoder::{AudioEncodeSettings, FfmpegTranscoder, Transcoder};
pub use types::{
    select_best_audio, select_best_progressive, select_best_video, BatchMode, BatchSummary,
    Event, FailedItem, JobId, JobReport, JobStage, MediaDetails, MediaKind, MediaSource,
    Metadata, PlaylistBatch, PlaylistItem, StreamDescriptor, StreamSelection,
};
