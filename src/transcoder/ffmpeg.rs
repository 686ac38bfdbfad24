//! CLI-based transcoder using the external ffmpeg binary

use super::progress::{parse_line, PercentTracker, ProgressLine};
use super::{AudioEncodeSettings, Transcoder};
use crate::config::TranscodeConfig;
use crate::error::{Error, Result, TranscodeError};
use crate::types::{Event, JobId};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// How much of ffmpeg's stderr to keep in error messages
const STDERR_TAIL_BYTES: usize = 2048;

/// Transcoder backed by an external `ffmpeg` process.
///
/// Progress is read from `-progress pipe:1` on stdout; stderr is drained
/// concurrently so the process can never block on a full pipe, and its tail
/// is attached to failures.
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl FfmpegTranscoder {
    /// Create a transcoder with an explicit ffmpeg binary path
    pub fn new(binary_path: PathBuf, event_tx: tokio::sync::broadcast::Sender<Event>) -> Self {
        Self {
            binary_path,
            event_tx,
        }
    }

    /// Discover ffmpeg from PATH
    ///
    /// # Errors
    ///
    /// Returns [`TranscodeError::BinaryNotFound`] when no `ffmpeg` binary is
    /// in PATH.
    pub fn from_path(event_tx: tokio::sync::broadcast::Sender<Event>) -> Result<Self> {
        let binary = which::which("ffmpeg").map_err(|_| TranscodeError::BinaryNotFound)?;
        Ok(Self::new(binary, event_tx))
    }

    /// Use the configured explicit path when present, discover otherwise
    pub fn from_config(
        config: &TranscodeConfig,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> Result<Self> {
        match &config.ffmpeg_path {
            Some(path) => Ok(Self::new(path.clone(), event_tx)),
            None => Self::from_path(event_tx),
        }
    }

    /// Run ffmpeg with the given arguments, streaming progress events.
    async fn run(
        &self,
        args: Vec<OsString>,
        output: &Path,
        total_duration: Option<Duration>,
        job: &JobId,
    ) -> Result<()> {
        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TranscodeError::Spawn {
                binary: self.binary_path.clone(),
                reason: e.to_string(),
            })?;

        // Both pipes must be fully consumed before waiting, otherwise a
        // chatty engine deadlocks on a full pipe buffer.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let progress_task = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            let mut tracker = PercentTracker::new(total_duration);

            while let Ok(Some(line)) = lines.next_line().await {
                match parse_line(&line) {
                    ProgressLine::OutTime(out_time) => {
                        if let Some(percent) = tracker.update(out_time) {
                            let _ = self.event_tx.send(Event::TranscodeProgress {
                                id: job.clone(),
                                percent,
                            });
                        }
                    }
                    ProgressLine::End => {
                        let _ = self.event_tx.send(Event::TranscodeProgress {
                            id: job.clone(),
                            percent: tracker.finish(),
                        });
                    }
                    ProgressLine::Other => {}
                }
            }
        };

        let stderr_task = async {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        };

        let (_, stderr_output, status) =
            tokio::join!(progress_task, stderr_task, child.wait());
        let status = status?;

        if !status.success() {
            return Err(Error::Transcode(TranscodeError::Engine {
                code: status.code(),
                stderr: tail(&stderr_output, STDERR_TAIL_BYTES),
            }));
        }

        // An engine that exits zero but writes nothing is still a failure.
        let len = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(Error::Transcode(TranscodeError::EmptyOutput(
                output.to_path_buf(),
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert_audio(
        &self,
        input: &Path,
        output: &Path,
        settings: &AudioEncodeSettings,
        job: &JobId,
    ) -> Result<()> {
        debug!(
            job = %job,
            input = %input.display(),
            output = %output.display(),
            bitrate_kbps = settings.bitrate_kbps,
            "converting audio"
        );

        let args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-nostats".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-i".into(),
            input.into(),
            "-vn".into(),
            "-ar".into(),
            settings.sample_rate.to_string().into(),
            "-ac".into(),
            settings.channels.to_string().into(),
            "-b:a".into(),
            format!("{}k", settings.bitrate_kbps).into(),
            output.into(),
        ];

        self.run(args, output, settings.total_duration, job).await?;
        info!(job = %job, output = %output.display(), "audio conversion complete");
        Ok(())
    }

    async fn merge_video_audio(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        total_duration: Option<Duration>,
        job: &JobId,
    ) -> Result<()> {
        debug!(
            job = %job,
            video = %video.display(),
            audio = %audio.display(),
            output = %output.display(),
            "merging video and audio"
        );

        // Video track is stream-copied; only the audio track is re-encoded.
        let args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-nostats".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-i".into(),
            video.into(),
            "-i".into(),
            audio.into(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            "aac".into(),
            output.into(),
        ];

        self.run(args, output, total_duration, job).await?;
        info!(job = %job, output = %output.display(), "merge complete");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

/// Last `max` bytes of a string, on a char boundary
fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.trim().to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].trim().to_string()
}
