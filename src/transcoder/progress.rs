//! Parser for ffmpeg `-progress pipe:1` output
//!
//! With `-progress`, ffmpeg writes `key=value` lines to the given fd,
//! one block per update, terminated by a `progress=continue|end` line.

use std::time::Duration;

/// One parsed line of `-progress` output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProgressLine {
    /// Position of the encoder in the output timeline
    OutTime(Duration),
    /// Final `progress=end` marker
    End,
    /// Any other key (fps, bitrate, speed, ...)
    Other,
}

/// Parse one line of `-progress` output.
// Note: ffmpeg's `out_time_ms` key is in microseconds despite its name
// (same value as `out_time_us`).
pub(crate) fn parse_line(line: &str) -> ProgressLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ProgressLine::Other;
    };

    match key {
        "out_time_us" | "out_time_ms" => match value.parse::<i64>() {
            Ok(us) if us >= 0 => ProgressLine::OutTime(Duration::from_micros(us as u64)),
            _ => ProgressLine::Other,
        },
        "progress" if value == "end" => ProgressLine::End,
        _ => ProgressLine::Other,
    }
}

/// Converts out-time updates into a monotonically non-decreasing percent.
///
/// Percent reporting is best-effort: without a known total duration no
/// percent can be computed and `update` always returns `None`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PercentTracker {
    total: Option<Duration>,
    last: f32,
}

impl PercentTracker {
    pub(crate) fn new(total: Option<Duration>) -> Self {
        Self { total, last: 0.0 }
    }

    /// Fold in a new out-time; returns the percent to report, if it advanced.
    pub(crate) fn update(&mut self, out_time: Duration) -> Option<f32> {
        let total = self.total?;
        if total.is_zero() {
            return None;
        }

        let percent = (out_time.as_secs_f64() / total.as_secs_f64() * 100.0).min(100.0) as f32;
        if percent > self.last {
            self.last = percent;
            Some(percent)
        } else {
            None
        }
    }

    /// Percent to report at successful completion
    pub(crate) fn finish(&mut self) -> f32 {
        self.last = 100.0;
        100.0
    }
}
