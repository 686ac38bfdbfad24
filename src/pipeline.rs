//! Per-job pipeline: fetch → (merge) → (convert) → (tag) → cleanup
//!
//! A [`DownloadJob`] moves through the stage machine
//! `Pending → Fetching → (Merging) → (Converting) → (Tagging) → Completed`,
//! with `Failed` reachable from any non-terminal stage. Terminal states are
//! final; a job value is never reused, retries construct a fresh job.
//!
//! Temp file ownership: a job holds at most two raw temp files (one audio,
//! one video) and exactly one destination path. Every temp file is released
//! on both the success and the failure path, except raw inputs of a failed
//! transcode, which are retained for diagnosis.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::StreamFetcher;
use crate::services::{ResolvedMedia, StreamResolver};
use crate::tagger::MetadataTagger;
use crate::temp_store::{TempKind, TempStore};
use crate::transcoder::{AudioEncodeSettings, Transcoder};
use crate::types::{
    Event, JobId, JobReport, JobStage, MediaDetails, MediaSource, Metadata, StreamSelection,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// One unit of work: a source, the chosen stream(s), and a destination
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Deterministic job id, derived from the destination file stem
    pub id: JobId,
    /// The media item being downloaded
    pub source: MediaSource,
    /// The stream(s) selected for this job
    pub selection: StreamSelection,
    /// Path of the finished file
    pub destination: PathBuf,
    /// Current pipeline stage
    pub state: JobStage,
}

impl DownloadJob {
    /// Construct a pending job. The id is derived from the destination file
    /// stem so temp naming stays reproducible across runs.
    pub fn new(source: MediaSource, selection: StreamSelection, destination: PathBuf) -> Self {
        let id = destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.identifier.clone());
        Self {
            id: JobId::new(id),
            source,
            selection,
            destination,
            state: JobStage::Pending,
        }
    }
}

/// Album and track context for deriving tag metadata.
///
/// Batch jobs carry the playlist title and position; single jobs carry the
/// configured default album and track 1.
#[derive(Clone, Debug)]
pub struct TagContext {
    /// Album tag value
    pub album: String,
    /// Track number tag value
    pub track: u32,
}

/// Composes fetcher, transcoder, tagger, and temp store into one job runner
#[derive(Clone)]
pub struct PipelineRunner {
    config: Arc<Config>,
    resolver: Arc<dyn StreamResolver>,
    transcoder: Arc<dyn Transcoder>,
    tagger: MetadataTagger,
    temp: TempStore,
    fetcher: StreamFetcher,
    event_tx: broadcast::Sender<Event>,
}

impl PipelineRunner {
    /// Create a pipeline runner over the given collaborators
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<dyn StreamResolver>,
        transcoder: Arc<dyn Transcoder>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        let temp = TempStore::new(config.download.temp_dir.clone());
        let fetcher = StreamFetcher::new(event_tx.clone());
        Self {
            config,
            resolver,
            transcoder,
            tagger: MetadataTagger::new(),
            temp,
            fetcher,
            event_tx,
        }
    }

    /// The stream-resolution service this pipeline fetches from
    pub fn resolver(&self) -> &Arc<dyn StreamResolver> {
        &self.resolver
    }

    /// Run one job to a terminal state.
    ///
    /// `resolved` is the resolution result for `job.source`, obtained by the
    /// caller before descriptor selection. `tag` applies to audio-destination
    /// jobs and is ignored for video output.
    ///
    /// # Errors
    ///
    /// Returns the failure wrapped with the stage it occurred in
    /// ([`Error::Stage`]). Temp files are released best-effort before the
    /// error surfaces, except raw inputs of a failed transcode.
    pub async fn run(
        &self,
        mut job: DownloadJob,
        resolved: &ResolvedMedia,
        tag: Option<TagContext>,
    ) -> Result<JobReport> {
        let _ = self.event_tx.send(Event::Queued {
            id: job.id.clone(),
            destination: job.destination.clone(),
        });

        match self.execute(&mut job, resolved, tag).await {
            Ok(()) => {
                job.state = JobStage::Completed;
                info!(job = %job.id, destination = %job.destination.display(), "job completed");
                let _ = self.event_tx.send(Event::Completed {
                    id: job.id.clone(),
                    destination: job.destination.clone(),
                });
                Ok(JobReport {
                    id: job.id,
                    destination: job.destination,
                })
            }
            Err(e) => {
                let stage = job.state;
                job.state = JobStage::Failed;

                // A partial destination would satisfy the completeness
                // predicate on the next run; remove it.
                if tokio::fs::remove_file(&job.destination).await.is_ok() {
                    debug!(job = %job.id, "removed partial destination file");
                }

                warn!(job = %job.id, stage = %stage, error = %e, "job failed");
                let _ = self.event_tx.send(Event::Failed {
                    id: job.id.clone(),
                    stage,
                    error: e.to_string(),
                });
                Err(Error::at_stage(stage, e))
            }
        }
    }

    async fn execute(
        &self,
        job: &mut DownloadJob,
        resolved: &ResolvedMedia,
        tag: Option<TagContext>,
    ) -> Result<()> {
        let duration = resolved.details.duration_secs.map(Duration::from_secs);
        let metadata = tag.map(|t| derive_metadata(&resolved.details, &t));

        match job.selection.clone() {
            StreamSelection::MergedVideo { video, audio } => {
                self.enter(job, JobStage::Fetching);

                // The merge step needs both finished files, so the fetches
                // run sequentially: video first, then audio.
                let video_raw = self.temp.allocate(&job.id, TempKind::VideoRaw).await?;
                if let Err(e) = self
                    .fetcher
                    .fetch(&*self.resolver, resolved, &job.source, &video, &video_raw, &job.id)
                    .await
                {
                    self.temp.release(&video_raw).await;
                    return Err(e);
                }

                let audio_raw = match self.temp.allocate(&job.id, TempKind::AudioRaw).await {
                    Ok(path) => path,
                    Err(e) => {
                        self.temp.release(&video_raw).await;
                        return Err(e);
                    }
                };
                if let Err(e) = self
                    .fetcher
                    .fetch(&*self.resolver, resolved, &job.source, &audio, &audio_raw, &job.id)
                    .await
                {
                    self.temp.release(&video_raw).await;
                    self.temp.release(&audio_raw).await;
                    return Err(e);
                }

                self.enter(job, JobStage::Merging);
                if let Err(e) = self
                    .transcoder
                    .merge_video_audio(&video_raw, &audio_raw, &job.destination, duration, &job.id)
                    .await
                {
                    // Raw inputs retained for inspection of the engine fault
                    return Err(e);
                }
                self.temp.release(&video_raw).await;
                self.temp.release(&audio_raw).await;

                // Video container output: tagging does not apply
                Ok(())
            }

            StreamSelection::Audio(descriptor) | StreamSelection::Progressive(descriptor) => {
                self.enter(job, JobStage::Fetching);

                let kind = if descriptor.has_video {
                    TempKind::VideoRaw
                } else {
                    TempKind::AudioRaw
                };
                let raw = self.temp.allocate(&job.id, kind).await?;
                if let Err(e) = self
                    .fetcher
                    .fetch(&*self.resolver, resolved, &job.source, &descriptor, &raw, &job.id)
                    .await
                {
                    self.temp.release(&raw).await;
                    return Err(e);
                }

                let destination_ext = job
                    .destination
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let needs_convert =
                    job.selection.is_audio_destination() && descriptor.container != destination_ext;

                if needs_convert {
                    self.enter(job, JobStage::Converting);
                    let settings = AudioEncodeSettings::from_config(&self.config.transcode, duration);
                    if let Err(e) = self
                        .transcoder
                        .convert_audio(&raw, &job.destination, &settings, &job.id)
                        .await
                    {
                        // Raw input retained for inspection of the engine fault
                        return Err(e);
                    }
                    self.temp.release(&raw).await;
                } else {
                    // Raw format already matches the destination; promote the
                    // temp file in place, no re-encode.
                    if let Err(e) = promote(&raw, &job.destination).await {
                        self.temp.release(&raw).await;
                        return Err(e);
                    }
                    self.temp.release(&raw).await;
                }

                if job.selection.is_audio_destination() {
                    self.enter(job, JobStage::Tagging);
                    if let Some(metadata) = metadata {
                        self.tagger.tag(&job.destination, &metadata).await?;
                    }
                }

                Ok(())
            }
        }
    }

    fn enter(&self, job: &mut DownloadJob, stage: JobStage) {
        job.state = stage;
        debug!(job = %job.id, stage = %stage, "entering stage");
        let _ = self.event_tx.send(Event::StageChanged {
            id: job.id.clone(),
            stage,
        });
    }
}

/// Derive the tag metadata for a job at job start. Cover bytes stay unset
/// here; they are fetched lazily right before tagging.
pub fn derive_metadata(details: &MediaDetails, tag: &TagContext) -> Metadata {
    Metadata {
        title: details.title.clone(),
        artist: details.channel.clone(),
        album: tag.album.clone(),
        track: tag.track,
        cover_bytes: None,
        cover_mime: None,
        thumbnail_url: details.thumbnail_url.clone(),
    }
}

/// Move a finished temp file to its destination, falling back to copy+remove
/// when rename crosses filesystems.
async fn promote(raw: &Path, destination: &Path) -> Result<()> {
    if tokio::fs::rename(raw, destination).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(raw, destination).await?;
    let _ = tokio::fs::remove_file(raw).await;
    Ok(())
}
