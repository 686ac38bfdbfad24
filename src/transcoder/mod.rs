//! External transcode engine
//!
//! The [`Transcoder`] trait is the seam to the external encode/mux engine.
//! [`FfmpegTranscoder`] implements it by spawning the `ffmpeg` binary;
//! tests substitute in-process mocks.

mod ffmpeg;
mod progress;

pub use ffmpeg::FfmpegTranscoder;

use crate::config::TranscodeConfig;
use crate::error::Result;
use crate::types::JobId;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Parameters for an audio conversion
#[derive(Clone, Debug)]
pub struct AudioEncodeSettings {
    /// Target bitrate in kbps
    pub bitrate_kbps: u32,
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count
    pub channels: u8,
    /// Total duration of the input, when known; enables percent progress
    pub total_duration: Option<Duration>,
}

impl AudioEncodeSettings {
    /// Build settings from configuration plus the media duration
    pub fn from_config(config: &TranscodeConfig, total_duration: Option<Duration>) -> Self {
        Self {
            bitrate_kbps: config.bitrate_kbps,
            sample_rate: config.sample_rate,
            channels: config.channels,
            total_duration,
        }
    }
}

/// Interface to the external encode/mux engine
///
/// Both operations run as a scoped process invocation: the call resolves only
/// after the process exits with its output fully drained. A non-zero exit or
/// an engine fault maps to [`crate::error::TranscodeError`]. On failure the
/// caller retains the raw input files for inspection.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encode a raw audio stream into the target format at `output`.
    ///
    /// # Errors
    ///
    /// Returns a transcode error when the engine cannot be spawned, exits
    /// non-zero, or produces an empty output file.
    async fn convert_audio(
        &self,
        input: &Path,
        output: &Path,
        settings: &AudioEncodeSettings,
        job: &JobId,
    ) -> Result<()>;

    /// Multiplex a video stream and an audio stream into one container.
    ///
    /// The video track is stream-copied (no re-encode); the audio track is
    /// encoded to a standard lossy codec.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Transcoder::convert_audio`].
    async fn merge_video_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        total_duration: Option<Duration>,
        job: &JobId,
    ) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
