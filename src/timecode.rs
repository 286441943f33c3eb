//! Frame-accurate timecodes.
//!
//! A [`FrameTimecode`] pairs a frame number with the frame rate it was
//! counted at, so it can be rendered as `HH:MM:SS.fff` for scene lists and
//! stats files, or converted to a [`Duration`] for the splitter.
//!
//! # Example
//!
//! ```
//! use scenecut::FrameTimecode;
//!
//! let timecode = FrameTimecode::new(90, 30.0);
//! assert_eq!(timecode.to_string(), "00:00:03.000");
//!
//! let parsed = FrameTimecode::parse("00:00:03.000", 30.0).unwrap();
//! assert_eq!(parsed.frame(), 90);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::error::{Result, SceneCutError};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// A frame number at a known frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTimecode {
    frame: u64,
    frames_per_second: f64,
}

impl FrameTimecode {
    /// Create a timecode for `frame` at `frames_per_second`.
    ///
    /// The frame rate is expected to be positive; callers validate it once
    /// when a frame source or stats file is opened.
    pub fn new(frame: u64, frames_per_second: f64) -> Self {
        Self {
            frame,
            frames_per_second,
        }
    }

    /// Create the timecode nearest to `duration`.
    pub fn from_duration(duration: Duration, frames_per_second: f64) -> Self {
        let frame = (duration.as_secs_f64() * frames_per_second).round() as u64;
        Self::new(frame, frames_per_second)
    }

    /// Parse a timecode string.
    ///
    /// Accepted forms:
    ///
    /// - `HH:MM:SS` or `HH:MM:SS.fff` (also `MM:SS[.fff]`)
    /// - seconds with a fractional part or an `s` suffix (`"12.5"`, `"12s"`)
    /// - a bare integer, taken as a frame number (`"300"`)
    pub fn parse(text: &str, frames_per_second: f64) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SceneCutError::config("timecode", "value cannot be empty"));
        }

        if trimmed.contains(':') {
            let parts: Vec<&str> = trimmed.split(':').collect();
            let (hours, minutes, seconds) = match parts.as_slice() {
                [hours, minutes, seconds] => (*hours, *minutes, *seconds),
                [minutes, seconds] => ("0", *minutes, *seconds),
                _ => {
                    return Err(SceneCutError::config(
                        "timecode",
                        format!("invalid timecode format: {trimmed}"),
                    ));
                }
            };
            let hours = parse_component(hours, trimmed)?;
            let minutes = parse_component(minutes, trimmed)?;
            let seconds: f64 = seconds.parse().map_err(|_| {
                SceneCutError::config("timecode", format!("invalid seconds in {trimmed}"))
            })?;
            if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
                return Err(SceneCutError::config(
                    "timecode",
                    format!("minutes and seconds must be below 60 in {trimmed}"),
                ));
            }
            let total = hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds;
            return seconds_to_timecode(total, trimmed, frames_per_second);
        }

        if let Some(seconds) = trimmed.strip_suffix('s') {
            let seconds: f64 = seconds.parse().map_err(|_| {
                SceneCutError::config("timecode", format!("invalid seconds value: {trimmed}"))
            })?;
            return seconds_to_timecode(seconds, trimmed, frames_per_second);
        }

        if let Ok(frame) = trimmed.parse::<u64>() {
            return Ok(Self::new(frame, frames_per_second));
        }

        let seconds: f64 = trimmed.parse().map_err(|_| {
            SceneCutError::config("timecode", format!("unrecognised timecode: {trimmed}"))
        })?;
        seconds_to_timecode(seconds, trimmed, frames_per_second)
    }

    /// The frame number.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The frame rate the frame number is counted at.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Position in seconds from the start of the stream.
    pub fn seconds(&self) -> f64 {
        if self.frames_per_second > 0.0 {
            self.frame as f64 / self.frames_per_second
        } else {
            0.0
        }
    }

    /// Position as a [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.seconds()).unwrap_or(Duration::MAX)
    }
}

impl Display for FrameTimecode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let total_millis = (self.seconds() * 1000.0).round() as u64;
        let hours = total_millis / MILLIS_PER_HOUR;
        let minutes = (total_millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let seconds = (total_millis % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let millis = total_millis % MILLIS_PER_SECOND;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
    }
}

fn parse_component(value: &str, whole: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| {
        SceneCutError::config("timecode", format!("invalid component `{value}` in {whole}"))
    })
}

fn seconds_to_timecode(seconds: f64, whole: &str, frames_per_second: f64) -> Result<FrameTimecode> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SceneCutError::config(
            "timecode",
            format!("seconds must be non-negative: {whole}"),
        ));
    }
    let frame = (seconds * frames_per_second).round();
    if !frame.is_finite() || frame > u64::MAX as f64 {
        return Err(SceneCutError::config(
            "timecode",
            format!("value is out of range: {whole}"),
        ));
    }
    Ok(FrameTimecode::new(frame as u64, frames_per_second))
}
