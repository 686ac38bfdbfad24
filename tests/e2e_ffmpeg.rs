//! End-to-end tests against a real ffmpeg binary
//!
//! These run the full pipeline (fetch from an in-process resolver, convert
//! with the system ffmpeg, tag) and are feature-gated so the default test
//! run does not depend on ffmpeg being installed.
//!
//! ```bash
//! cargo test --features ffmpeg-tests --test e2e_ffmpeg
//! ```

#![cfg(feature = "ffmpeg-tests")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use media_dl::{
    Config, Error, MediaDetails, MediaDownloader, MediaSource, MediaStream, PlaylistBatch,
    PlaylistProvider, ResolvedMedia, Result, StreamDescriptor, StreamResolver, StreamSelection,
};
use std::path::Path;
use std::sync::Arc;

/// Generate a one-second sine wave in a wav container with the system ffmpeg
async fn generate_wav(path: &Path) {
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", "sine=frequency=440:duration=1"])
        .arg(path)
        .status()
        .await
        .expect("ffmpeg not runnable");
    assert!(status.success(), "wav generation failed");
}

fn wav_descriptor() -> StreamDescriptor {
    StreamDescriptor {
        format_id: "wav-1".to_string(),
        container: "wav".to_string(),
        codec: "pcm_s16le".to_string(),
        bitrate_kbps: 1411,
        sample_rate: Some(44100),
        channels: Some(1),
        has_audio: true,
        has_video: false,
        quality_label: "lossless".to_string(),
    }
}

/// Resolver serving one fixed media item whose stream body is a file on disk
struct FileResolver {
    body: Vec<u8>,
}

#[async_trait]
impl StreamResolver for FileResolver {
    async fn resolve(&self, identifier: &str) -> Result<ResolvedMedia> {
        if identifier != "tone" {
            return Err(Error::InvalidSource {
                identifier: identifier.to_string(),
                reason: "unknown media id".to_string(),
            });
        }
        Ok(ResolvedMedia {
            details: MediaDetails {
                title: "Test Tone".to_string(),
                channel: "Signal Generator".to_string(),
                duration_secs: Some(1),
                thumbnail_url: None,
            },
            descriptors: vec![wav_descriptor()],
        })
    }

    async fn open_stream(
        &self,
        _identifier: &str,
        _descriptor: &StreamDescriptor,
    ) -> Result<MediaStream> {
        let chunks: Vec<Result<Bytes>> = self
            .body
            .chunks(8192)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(MediaStream::new(
            Some(self.body.len() as u64),
            futures::stream::iter(chunks).boxed(),
        ))
    }
}

/// Playlist provider that knows no playlists; single-job tests only
struct NoPlaylists;

#[async_trait]
impl PlaylistProvider for NoPlaylists {
    async fn list(&self, list_identifier: &str) -> Result<PlaylistBatch> {
        Err(Error::InvalidSource {
            identifier: list_identifier.to_string(),
            reason: "no playlists configured".to_string(),
        })
    }
}

#[tokio::test]
async fn wav_stream_converts_to_tagged_mp3() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("tone.wav");
    generate_wav(&wav).await;
    let body = tokio::fs::read(&wav).await.unwrap();

    let config = Config {
        download: media_dl::DownloadConfig {
            downloads_dir: dir.path().join("downloads"),
            temp_dir: dir.path().join("temp"),
            ..Default::default()
        },
        ..Default::default()
    };
    let downloader = MediaDownloader::new(
        config,
        Arc::new(FileResolver { body }),
        Arc::new(NoPlaylists),
    )
    .expect("ffmpeg should be discoverable on PATH");

    let destination = dir.path().join("downloads/Test Tone [tone].mp3");
    let report = downloader
        .run_single_job(
            MediaSource::audio("tone"),
            StreamSelection::Audio(wav_descriptor()),
            destination.clone(),
        )
        .await
        .unwrap();

    assert_eq!(report.destination, destination);
    let size = tokio::fs::metadata(&destination).await.unwrap().len();
    assert!(size > 1024, "mp3 output suspiciously small: {size} bytes");

    let tag = id3::Tag::read_from_path(&destination).unwrap();
    assert_eq!(tag.title(), Some("Test Tone"));
    assert_eq!(tag.artist(), Some("Signal Generator"));
    assert_eq!(tag.track(), Some(1));

    // Temp files are cleaned up after a successful run
    let leftovers: Vec<_> = walkdir::WalkDir::new(dir.path().join("temp"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    assert!(leftovers.is_empty());
}
