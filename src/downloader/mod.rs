//! The `MediaDownloader` facade
//!
//! Owns configuration, the service handles, and the broadcast event channel,
//! and exposes the two in-process entry points the embedding application
//! calls: [`MediaDownloader::run_single_job`] and
//! [`MediaDownloader::run_batch`]. There is no network listener and no CLI;
//! prompting, URL validation, and progress rendering belong to the embedder.

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests;

use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{DownloadJob, PipelineRunner, TagContext};
use crate::retry::with_retry;
use crate::services::{PlaylistProvider, StreamResolver};
use crate::transcoder::{FfmpegTranscoder, Transcoder};
use crate::types::{BatchMode, BatchSummary, Event, JobReport, MediaSource, StreamSelection};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Capacity of the broadcast event channel
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Entry point for embedding applications
pub struct MediaDownloader {
    config: Arc<Config>,
    playlists: Arc<dyn PlaylistProvider>,
    pipeline: PipelineRunner,
    orchestrator: BatchOrchestrator,
    event_tx: broadcast::Sender<Event>,
}

impl MediaDownloader {
    /// Create a downloader using the external ffmpeg binary as transcoder.
    ///
    /// The binary is taken from `config.transcode.ffmpeg_path` when set and
    /// discovered from PATH otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TranscodeError::BinaryNotFound`] when no
    /// ffmpeg binary can be located.
    pub fn new(
        config: Config,
        resolver: Arc<dyn StreamResolver>,
        playlists: Arc<dyn PlaylistProvider>,
    ) -> Result<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let transcoder: Arc<dyn Transcoder> =
            Arc::new(FfmpegTranscoder::from_config(&config.transcode, event_tx.clone())?);
        Ok(Self::with_transcoder_and_channel(
            config, resolver, playlists, transcoder, event_tx,
        ))
    }

    /// Create a downloader with an explicit transcoder implementation
    pub fn with_transcoder(
        config: Config,
        resolver: Arc<dyn StreamResolver>,
        playlists: Arc<dyn PlaylistProvider>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self::with_transcoder_and_channel(config, resolver, playlists, transcoder, event_tx)
    }

    fn with_transcoder_and_channel(
        config: Config,
        resolver: Arc<dyn StreamResolver>,
        playlists: Arc<dyn PlaylistProvider>,
        transcoder: Arc<dyn Transcoder>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        let config = Arc::new(config);
        let pipeline = PipelineRunner::new(
            config.clone(),
            resolver,
            transcoder,
            event_tx.clone(),
        );
        let orchestrator =
            BatchOrchestrator::new(config.clone(), pipeline.clone(), event_tx.clone());
        Self {
            config,
            playlists,
            pipeline,
            orchestrator,
            event_tx,
        }
    }

    /// Subscribe to lifecycle and progress events.
    ///
    /// Events are advisory; the authoritative outcome of an operation is its
    /// returned `Result`. Receivers may lag or drop without affecting jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one download job to a terminal state.
    ///
    /// Resolves the source, validates the selection against the offered
    /// descriptors, and runs the fetch/merge/convert/tag pipeline. Transient
    /// (network-class) failures are retried per the configured
    /// [`crate::config::RetryConfig`]; every attempt constructs a fresh job.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last attempt, annotated with the pipeline
    /// stage it occurred in.
    pub async fn run_single_job(
        &self,
        source: MediaSource,
        selection: StreamSelection,
        destination: PathBuf,
    ) -> Result<JobReport> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tag = selection.is_audio_destination().then(|| TagContext {
            album: self.config.download.default_album.clone(),
            track: 1,
        });

        with_retry(&self.config.retry, || async {
            let resolved = self.pipeline.resolver().resolve(&source.identifier).await?;
            let job = DownloadJob::new(source.clone(), selection.clone(), destination.clone());
            self.pipeline.run(job, &resolved, tag.clone()).await
        })
        .await
    }

    /// Run a whole playlist as a batch.
    ///
    /// Takes one snapshot of the playlist up front (not refreshed mid-run),
    /// then delegates to the batch orchestrator: strictly sequential jobs,
    /// skip-if-complete per item, per-item failure isolation.
    ///
    /// # Errors
    ///
    /// Fails only when the playlist cannot be listed or the destination
    /// directory cannot be created; item failures are recorded in the
    /// returned [`BatchSummary`] instead.
    pub async fn run_batch(&self, list_identifier: &str, mode: BatchMode) -> Result<BatchSummary> {
        let batch = self.playlists.list(list_identifier).await?;
        info!(
            list = list_identifier,
            title = %batch.title,
            items = batch.items.len(),
            "playlist snapshot taken"
        );
        self.orchestrator.run(&batch, mode).await
    }
}
