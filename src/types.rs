//! Core types and events for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a download job.
///
/// Job ids are derived from the destination file stem, which is itself a
/// deterministic slug of the media title plus the source identifier. The same
/// job therefore always produces the same id across runs, which makes temp
/// file names reproducible: a crashed run's leaked temp files are reclaimed
/// the next time the same job allocates them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// What kind of media an identifier refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A single video item
    Video,
    /// A single audio item (audio track of a video)
    Audio,
    /// An ordered playlist of items
    Playlist,
}

/// A remote media item, immutable once resolved
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    /// Opaque identifier understood by the stream-resolution service
    pub identifier: String,
    /// What this identifier refers to
    pub kind: MediaKind,
}

impl MediaSource {
    /// A single video source
    pub fn video(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: MediaKind::Video,
        }
    }

    /// A single audio source
    pub fn audio(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: MediaKind::Audio,
        }
    }
}

/// One available encoding of a media item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Service-assigned identifier for this encoding
    pub format_id: String,
    /// Container format of the raw stream (e.g. "webm", "mp4")
    pub container: String,
    /// Codec name (e.g. "opus", "h264")
    pub codec: String,
    /// Bitrate in kbps
    pub bitrate_kbps: u32,
    /// Audio sample rate in Hz, if known
    pub sample_rate: Option<u32>,
    /// Audio channel count, if known
    pub channels: Option<u8>,
    /// Whether this encoding carries an audio track
    pub has_audio: bool,
    /// Whether this encoding carries a video track
    pub has_video: bool,
    /// Human-readable quality label (e.g. "1080p", "AUDIO_QUALITY_MEDIUM")
    pub quality_label: String,
}

impl StreamDescriptor {
    /// Audio track only, no video
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Video track only, no audio
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    /// Carries both tracks in one stream
    pub fn is_progressive(&self) -> bool {
        self.has_audio && self.has_video
    }
}

/// Pick the best audio descriptor: audio-only encodings preferred, highest
/// bitrate wins. Falls back to any audio-bearing encoding.
pub fn select_best_audio(descriptors: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    descriptors
        .iter()
        .filter(|d| d.is_audio_only())
        .max_by_key(|d| d.bitrate_kbps)
        .or_else(|| {
            descriptors
                .iter()
                .filter(|d| d.has_audio)
                .max_by_key(|d| d.bitrate_kbps)
        })
}

/// Pick the best progressive descriptor (audio and video in one stream),
/// highest bitrate wins.
pub fn select_best_progressive(descriptors: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    descriptors
        .iter()
        .filter(|d| d.is_progressive())
        .max_by_key(|d| d.bitrate_kbps)
}

/// Pick the best video-only descriptor, highest bitrate wins.
pub fn select_best_video(descriptors: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    descriptors
        .iter()
        .filter(|d| d.is_video_only())
        .max_by_key(|d| d.bitrate_kbps)
}

/// Which stream(s) a job downloads
#[derive(Clone, Debug)]
pub enum StreamSelection {
    /// One audio stream, converted to the target audio format and tagged
    Audio(StreamDescriptor),
    /// One progressive stream (audio + video), saved as-is
    Progressive(StreamDescriptor),
    /// Separate video and audio streams, merged into one container
    MergedVideo {
        /// The video-only stream (copied into the output without re-encoding)
        video: StreamDescriptor,
        /// The audio-only stream (re-encoded during the merge)
        audio: StreamDescriptor,
    },
}

impl StreamSelection {
    /// Whether the finished file is an audio file eligible for tagging
    pub fn is_audio_destination(&self) -> bool {
        matches!(self, StreamSelection::Audio(_))
    }
}

/// Pipeline stage of a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    /// Constructed but not yet started
    Pending,
    /// Streaming raw bytes to temp storage
    Fetching,
    /// Muxing separate video and audio streams into one container
    Merging,
    /// Re-encoding raw audio into the target format
    Converting,
    /// Writing metadata tags to the finished file
    Tagging,
    /// Terminal: finished successfully
    Completed,
    /// Terminal: failed with a stage and cause
    Failed,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStage::Pending => "pending",
            JobStage::Fetching => "fetching",
            JobStage::Merging => "merging",
            JobStage::Converting => "converting",
            JobStage::Tagging => "tagging",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Descriptive details of a resolved media item, used to derive tag metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    /// Media title
    pub title: String,
    /// Channel or uploader name (becomes the artist tag)
    pub channel: String,
    /// Duration in seconds, if known (used for transcode percent reporting)
    pub duration_secs: Option<u64>,
    /// Thumbnail URL for lazy cover art fetching
    pub thumbnail_url: Option<String>,
}

/// Tag metadata for a finished audio file.
///
/// Derived from [`MediaDetails`] at job start; `cover_bytes` is fetched once,
/// lazily, only before tagging.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    /// Track title
    pub title: String,
    /// Artist (channel name)
    pub artist: String,
    /// Album (playlist title for batch jobs, configured default otherwise)
    pub album: String,
    /// Track number (playlist position for batch jobs, 1 otherwise)
    pub track: u32,
    /// Cover image bytes, if already available
    pub cover_bytes: Option<Vec<u8>>,
    /// Cover image MIME type, if already known
    pub cover_mime: Option<String>,
    /// URL to fetch cover bytes from when `cover_bytes` is absent
    pub thumbnail_url: Option<String>,
}

/// One item of a playlist snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Identifier of the media item
    pub identifier: String,
    /// Item title as reported by the playlist service
    pub title: String,
}

/// Read-only snapshot of a playlist, taken once at batch start
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistBatch {
    /// Identifier of the playlist
    pub list_identifier: String,
    /// Playlist title (names the destination subdirectory)
    pub title: String,
    /// Items in source order
    pub items: Vec<PlaylistItem>,
}

/// What a batch run produces per item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Download each item as a video file
    VideoPlaylist,
    /// Download each item's audio track as a tagged audio file
    AudioPlaylist,
}

/// An item that failed during a batch run, with its cause
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FailedItem {
    /// The playlist item that failed
    pub item: PlaylistItem,
    /// Zero-based position of the item in the batch
    pub index: usize,
    /// Human-readable failure cause
    pub error: String,
}

/// Aggregated result of a batch run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Title of the batch (playlist)
    pub batch_title: String,
    /// When the batch started
    pub started_at: DateTime<Utc>,
    /// When the batch finished
    pub finished_at: DateTime<Utc>,
    /// Items downloaded during this run
    pub completed: Vec<PlaylistItem>,
    /// Items skipped because their destination file already exists and is non-empty
    pub skipped: Vec<PlaylistItem>,
    /// Items that failed, with causes; a failed item never aborts the batch
    pub failed: Vec<FailedItem>,
}

/// Result of a successfully completed job
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    /// The job's id
    pub id: JobId,
    /// Path of the finished, tagged file
    pub destination: PathBuf,
}

/// Event emitted during the job and batch lifecycle.
///
/// Events are delivered on a broadcast channel that callers may ignore; the
/// authoritative outcome of a job is always its returned `Result`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A job was constructed and is about to run
    Queued {
        /// Job ID
        id: JobId,
        /// Destination path of the finished file
        destination: PathBuf,
    },

    /// A job moved to a new pipeline stage
    StageChanged {
        /// Job ID
        id: JobId,
        /// The stage the job entered
        stage: JobStage,
    },

    /// Bytes arrived from the remote stream
    FetchProgress {
        /// Job ID
        id: JobId,
        /// Bytes received so far
        bytes_received: u64,
        /// Total payload size, when the source reports one
        #[serde(skip_serializing_if = "Option::is_none")]
        bytes_total: Option<u64>,
    },

    /// The transcode engine reported progress
    TranscodeProgress {
        /// Job ID
        id: JobId,
        /// Percent complete (0-100, monotonically non-decreasing, best-effort)
        percent: f32,
    },

    /// A job reached the Completed terminal state
    Completed {
        /// Job ID
        id: JobId,
        /// Path of the finished file
        destination: PathBuf,
    },

    /// A job reached the Failed terminal state
    Failed {
        /// Job ID
        id: JobId,
        /// Stage that was active when the failure occurred
        stage: JobStage,
        /// Failure cause
        error: String,
    },

    /// A batch item was skipped because its destination is already complete
    ItemSkipped {
        /// Zero-based position of the item in the batch
        index: usize,
        /// The destination that already exists
        destination: PathBuf,
    },

    /// A batch run finished
    BatchFinished {
        /// Batch title
        batch_title: String,
        /// Number of items completed this run
        completed: usize,
        /// Number of items skipped
        skipped: usize,
        /// Number of items that failed
        failed: usize,
    },
}
