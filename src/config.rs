//! Configuration types
//!
//! All settings have sensible defaults; `Config::default()` is a working
//! configuration provided an `ffmpeg` binary is discoverable in PATH.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level library configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// File placement and naming settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External transcode engine settings
    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,
}

/// File placement and naming settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory for finished files (default: "downloads").
    /// Batch runs create one subdirectory per playlist title underneath.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Scratch root for raw, not-yet-finalized streams (default: "temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Extension of finished audio files (default: "mp3")
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Extension of finished video files (default: "mp4")
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    /// Album tag for single (non-batch) audio jobs (default: "Downloads").
    /// Batch jobs use the playlist title instead.
    #[serde(default = "default_album")]
    pub default_album: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            temp_dir: default_temp_dir(),
            audio_extension: default_audio_extension(),
            video_extension: default_video_extension(),
            default_album: default_album(),
        }
    }
}

/// External transcode engine settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Target audio bitrate in kbps (default: 192)
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Target audio sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Target audio channel count (default: 2)
    #[serde(default = "default_channels")]
    pub channels: u8,

    /// Explicit path to the ffmpeg binary. When absent the binary is
    /// discovered from PATH.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: default_bitrate_kbps(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            ffmpeg_path: None,
        }
    }
}

/// Retry behavior for transient failures.
///
/// Applied by the orchestrator around whole job attempts, never inside the
/// fetch primitive itself, so retry behavior is bounded and testable in
/// isolation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

fn default_video_extension() -> String {
    "mp4".to_string()
}

fn default_album() -> String {
    "Downloads".to_string()
}

fn default_bitrate_kbps() -> u32 {
    192
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_channels() -> u8 {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Serde adapter storing durations as whole seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
