//! Error types for the `scenecut` crate.
//!
//! This module defines [`SceneCutError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry the frame index, option
//! name, or tool name involved so callers can report them without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SceneCutError> = std::result::Result<T, E>;

/// The unified error type for all `scenecut` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneCutError {
    /// A frame delivered by the frame source was malformed.
    ///
    /// Fatal for the current pass. Scenes assembled before the failure are
    /// still available through
    /// [`SceneAnalyzer::analyze_partial`](crate::SceneAnalyzer::analyze_partial),
    /// but should be discarded.
    #[error("Malformed frame {frame_index}: {reason}")]
    FrameDecode {
        /// Index of the offending frame.
        frame_index: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// The frame source delivered frames out of order or with gaps.
    #[error("Frame sequence broken: expected frame {expected}, got frame {found}")]
    FrameSequence {
        /// The index the analyzer was waiting for.
        expected: u64,
        /// The index it received.
        found: u64,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration for `{option}`: {reason}")]
    ConfigValidation {
        /// Name of the rejected option.
        option: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A stats file does not fit the requested detector.
    ///
    /// The analyzer recovers from this on its own by recomputing metrics.
    #[error("Stats file cannot be replayed: {0}")]
    StatsReplayMismatch(String),

    /// A stats file could not be parsed.
    #[error("Stats file is corrupt: {0}")]
    StatsFileCorrupt(String),

    /// The scene assembler produced an inconsistent scene list.
    ///
    /// This always indicates a defect in a detector.
    #[error("Scene assembly invariant violated: {0}")]
    AssemblyInvariantViolation(String),

    /// The analysis was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An image sequence directory contained no readable frames.
    #[error("No frames found in {0}")]
    NoFrames(PathBuf),

    /// An external splitting tool failed or could not be started.
    #[error("{tool} failed: {reason}")]
    SplitTool {
        /// Tool binary name (`ffmpeg`, `mkvmerge`).
        tool: String,
        /// Exit status or spawn failure.
        reason: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while loading a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),
}

impl SceneCutError {
    /// Shorthand for a [`SceneCutError::ConfigValidation`].
    pub(crate) fn config(option: &'static str, reason: impl Into<String>) -> Self {
        SceneCutError::ConfigValidation {
            option,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`SceneCutError::FrameDecode`].
    pub(crate) fn frame(frame_index: u64, reason: impl Into<String>) -> Self {
        SceneCutError::FrameDecode {
            frame_index,
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for SceneCutError {
    fn from(error: csv::Error) -> Self {
        if !error.is_io_error() {
            return SceneCutError::StatsFileCorrupt(error.to_string());
        }
        match error.into_kind() {
            csv::ErrorKind::Io(error) => SceneCutError::IoError(error),
            kind => SceneCutError::StatsFileCorrupt(format!("{kind:?}")),
        }
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for SceneCutError {
    fn from(error: ffmpeg_next::Error) -> Self {
        SceneCutError::FfmpegError(error.to_string())
    }
}
