//! Shared test doubles for pipeline and batch tests.

use crate::config::{Config, DownloadConfig, RetryConfig};
use crate::downloader::MediaDownloader;
use crate::error::{Error, Result, TranscodeError};
use crate::services::{MediaStream, PlaylistProvider, ResolvedMedia, StreamResolver};
use crate::transcoder::{AudioEncodeSettings, Transcoder};
use crate::types::{JobId, MediaDetails, PlaylistBatch, StreamDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An audio-only descriptor with a webm/opus raw container
pub(crate) fn audio_descriptor(format_id: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.to_string(),
        container: "webm".to_string(),
        codec: "opus".to_string(),
        bitrate_kbps: 160,
        sample_rate: Some(48000),
        channels: Some(2),
        has_audio: true,
        has_video: false,
        quality_label: "AUDIO_QUALITY_MEDIUM".to_string(),
    }
}

/// A video-only descriptor
pub(crate) fn video_descriptor(format_id: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.to_string(),
        container: "mp4".to_string(),
        codec: "h264".to_string(),
        bitrate_kbps: 2500,
        sample_rate: None,
        channels: None,
        has_audio: false,
        has_video: true,
        quality_label: "1080p".to_string(),
    }
}

/// A progressive descriptor carrying both tracks in an mp4 container
pub(crate) fn progressive_descriptor(format_id: &str) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.to_string(),
        container: "mp4".to_string(),
        codec: "h264+aac".to_string(),
        bitrate_kbps: 1200,
        sample_rate: Some(44100),
        channels: Some(2),
        has_audio: true,
        has_video: true,
        quality_label: "720p".to_string(),
    }
}

/// Build a resolved media item with the given title and descriptors
pub(crate) fn resolved(title: &str, descriptors: Vec<StreamDescriptor>) -> ResolvedMedia {
    ResolvedMedia {
        details: MediaDetails {
            title: title.to_string(),
            channel: "Test Channel".to_string(),
            duration_secs: Some(90),
            thumbnail_url: None,
        },
        descriptors,
    }
}

/// In-memory stream-resolution service with failure injection
#[derive(Default)]
pub(crate) struct MockResolver {
    media: HashMap<String, ResolvedMedia>,
    bodies: HashMap<String, Vec<u8>>,
    fail_open: HashSet<String>,
    fail_mid_stream: HashSet<String>,
    open_calls: AtomicUsize,
}

impl MockResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_media(mut self, identifier: &str, resolved: ResolvedMedia) -> Self {
        self.media.insert(identifier.to_string(), resolved);
        self
    }

    pub(crate) fn with_body(mut self, identifier: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(identifier.to_string(), body);
        self
    }

    /// `open_stream` fails immediately for this identifier
    pub(crate) fn with_open_failure(mut self, identifier: &str) -> Self {
        self.fail_open.insert(identifier.to_string());
        self
    }

    /// The stream errors after delivering one chunk for this identifier
    pub(crate) fn with_stream_failure(mut self, identifier: &str) -> Self {
        self.fail_mid_stream.insert(identifier.to_string());
        self
    }

    /// Number of times a stream body was opened
    pub(crate) fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamResolver for MockResolver {
    async fn resolve(&self, identifier: &str) -> Result<ResolvedMedia> {
        self.media
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::InvalidSource {
                identifier: identifier.to_string(),
                reason: "unknown media id".to_string(),
            })
    }

    async fn open_stream(
        &self,
        identifier: &str,
        _descriptor: &StreamDescriptor,
    ) -> Result<MediaStream> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_open.contains(identifier) {
            return Err(Error::StreamUnavailable(
                "descriptor no longer valid on the service side".to_string(),
            ));
        }

        let body = self.bodies.get(identifier).cloned().unwrap_or_default();
        let total = Some(body.len() as u64);

        if self.fail_mid_stream.contains(identifier) {
            let first: Bytes = body.into();
            let chunks = futures::stream::iter(vec![
                Ok(first),
                Err(Error::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionReset,
                ))),
            ]);
            return Ok(MediaStream::new(None, chunks.boxed()));
        }

        let chunks: Vec<Result<Bytes>> = body
            .chunks(64)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(MediaStream::new(total, futures::stream::iter(chunks).boxed()))
    }
}

/// Playlist service returning a fixed snapshot
pub(crate) struct MockPlaylist {
    batch: PlaylistBatch,
}

impl MockPlaylist {
    pub(crate) fn new(batch: PlaylistBatch) -> Self {
        Self { batch }
    }
}

#[async_trait]
impl PlaylistProvider for MockPlaylist {
    async fn list(&self, list_identifier: &str) -> Result<PlaylistBatch> {
        if list_identifier == self.batch.list_identifier {
            Ok(self.batch.clone())
        } else {
            Err(Error::InvalidSource {
                identifier: list_identifier.to_string(),
                reason: "unknown playlist id".to_string(),
            })
        }
    }
}

/// In-process transcoder double. Conversion copies the input, merge
/// concatenates video and audio bytes, so output contents are assertable.
#[derive(Default)]
pub(crate) struct MockTranscoder {
    pub(crate) fail: bool,
    convert_calls: AtomicUsize,
    merge_calls: AtomicUsize,
}

impl MockTranscoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn convert_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn merge_calls(&self) -> usize {
        self.merge_calls.load(Ordering::SeqCst)
    }

    fn engine_failure() -> Error {
        Error::Transcode(TranscodeError::Engine {
            code: Some(1),
            stderr: "mock engine failure".to_string(),
        })
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn convert_audio(
        &self,
        input: &Path,
        output: &Path,
        _settings: &AudioEncodeSettings,
        _job: &JobId,
    ) -> Result<()> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Self::engine_failure());
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn merge_video_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        _total_duration: Option<Duration>,
        _job: &JobId,
    ) -> Result<()> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Self::engine_failure());
        }
        let mut merged = tokio::fs::read(video).await?;
        merged.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, merged).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Config rooted in a temp dir, with fast retry settings
pub(crate) fn test_config(root: &Path) -> Config {
    Config {
        download: DownloadConfig {
            downloads_dir: root.join("downloads"),
            temp_dir: root.join("temp"),
            ..DownloadConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    }
}

/// Helper to create a test MediaDownloader over mocks.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    resolver: Arc<MockResolver>,
    playlists: Arc<MockPlaylist>,
    transcoder: Arc<MockTranscoder>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let config = test_config(temp_dir.path());
    let downloader =
        MediaDownloader::with_transcoder(config, resolver, playlists, transcoder);
    (downloader, temp_dir)
}

/// Count regular files below a directory (empty when the dir is absent)
pub(crate) fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect()
}
