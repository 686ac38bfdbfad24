//! Batch orchestration across playlist items
//!
//! Iterates a playlist snapshot strictly in source order, skipping items
//! whose destination file already exists with non-zero size, and runs one
//! pipeline job at a time. Jobs are never run concurrently: this bounds
//! resource usage to one external transcode process and at most two open
//! streams, and keeps destination-directory mutation single-owner. A
//! per-item failure is recorded and never halts the batch. The on-disk
//! output files themselves double as the resumption marker; no other state
//! is persisted between runs.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{DownloadJob, PipelineRunner, TagContext};
use crate::retry::with_retry;
use crate::types::{
    select_best_audio, select_best_progressive, BatchMode, BatchSummary, Event, FailedItem,
    JobReport, MediaSource, PlaylistBatch, PlaylistItem, StreamSelection,
};
use crate::utils::{destination_stem, is_complete, slug};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Applies the pipeline across the items of a playlist snapshot
pub struct BatchOrchestrator {
    config: Arc<Config>,
    pipeline: PipelineRunner,
    event_tx: broadcast::Sender<Event>,
}

impl BatchOrchestrator {
    /// Create an orchestrator that runs jobs through the given pipeline
    pub fn new(
        config: Arc<Config>,
        pipeline: PipelineRunner,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            config,
            pipeline,
            event_tx,
        }
    }

    /// Run a batch to completion and return the aggregated summary.
    ///
    /// # Errors
    ///
    /// Only destination-directory creation is fatal to the batch as a whole;
    /// every per-item failure is caught and recorded in the summary instead.
    pub async fn run(&self, batch: &PlaylistBatch, mode: BatchMode) -> Result<BatchSummary> {
        let directory = self.config.download.downloads_dir.join(slug(&batch.title));
        tokio::fs::create_dir_all(&directory).await?;

        info!(
            batch = %batch.title,
            items = batch.items.len(),
            ?mode,
            directory = %directory.display(),
            "starting batch"
        );

        let started_at = chrono::Utc::now();
        let mut completed = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for (index, item) in batch.items.iter().enumerate() {
            let stem = destination_stem(&item.title, &item.identifier);
            let extension = match mode {
                BatchMode::VideoPlaylist => &self.config.download.video_extension,
                BatchMode::AudioPlaylist => &self.config.download.audio_extension,
            };
            let destination = directory.join(format!("{stem}.{extension}"));

            if is_complete(&destination) {
                info!(item = %item.title, "destination already complete, skipping");
                let _ = self.event_tx.send(Event::ItemSkipped {
                    index,
                    destination: destination.clone(),
                });
                skipped.push(item.clone());
                continue;
            }

            let result = with_retry(&self.config.retry, || {
                self.run_item(batch, item, index, mode, &destination)
            })
            .await;

            match result {
                Ok(_) => completed.push(item.clone()),
                Err(e) => {
                    warn!(item = %item.title, index, error = %e, "item failed, continuing batch");
                    failed.push(FailedItem {
                        item: item.clone(),
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = BatchSummary {
            batch_title: batch.title.clone(),
            started_at,
            finished_at: chrono::Utc::now(),
            completed,
            skipped,
            failed,
        };

        info!(
            batch = %batch.title,
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "batch finished"
        );
        let _ = self.event_tx.send(Event::BatchFinished {
            batch_title: summary.batch_title.clone(),
            completed: summary.completed.len(),
            skipped: summary.skipped.len(),
            failed: summary.failed.len(),
        });

        Ok(summary)
    }

    /// One full attempt for one item: resolve, select, run the pipeline.
    /// Each retry attempt constructs a fresh job; terminal job states are
    /// never reused.
    async fn run_item(
        &self,
        batch: &PlaylistBatch,
        item: &PlaylistItem,
        index: usize,
        mode: BatchMode,
        destination: &Path,
    ) -> Result<JobReport> {
        let resolved = self.pipeline.resolver().resolve(&item.identifier).await?;

        let (source, selection, tag) = match mode {
            BatchMode::VideoPlaylist => {
                let descriptor = select_best_progressive(&resolved.descriptors)
                    .ok_or_else(|| {
                        Error::StreamUnavailable(format!(
                            "no progressive encoding offered for '{}'",
                            item.identifier
                        ))
                    })?
                    .clone();
                (
                    MediaSource::video(&item.identifier),
                    StreamSelection::Progressive(descriptor),
                    None,
                )
            }
            BatchMode::AudioPlaylist => {
                let descriptor = select_best_audio(&resolved.descriptors)
                    .ok_or_else(|| {
                        Error::StreamUnavailable(format!(
                            "no audio encoding offered for '{}'",
                            item.identifier
                        ))
                    })?
                    .clone();
                (
                    MediaSource::audio(&item.identifier),
                    StreamSelection::Audio(descriptor),
                    Some(TagContext {
                        album: batch.title.clone(),
                        track: (index + 1) as u32,
                    }),
                )
            }
        };

        let job = DownloadJob::new(source, selection, destination.to_path_buf());
        self.pipeline.run(job, &resolved, tag).await
    }
}
