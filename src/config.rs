//! Detector and analysis configuration.
//!
//! [`DetectorConfig`] holds the immutable knobs of the detection engine
//! (threshold, minimum scene length, fade handling). [`AnalysisOptions`]
//! threads progress callbacks, cancellation tokens, and stats-file settings
//! through a pass without polluting every function signature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use scenecut::{AnalysisOptions, CancellationToken, DetectionMode, DetectorConfig};
//!
//! let config = DetectorConfig::new(DetectionMode::Content)
//!     .with_threshold(27.0)
//!     .with_min_scene_len(12);
//! config.validate().unwrap();
//!
//! let token = CancellationToken::new();
//! let options = AnalysisOptions::new()
//!     .with_cancellation(token.clone())
//!     .with_stats_file("video.stats.csv")
//!     .with_batch_size(100);
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, SceneCutError};
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bpp). This is the default.
    #[default]
    Rgb8,
    /// 8-bit RGBA (32 bpp). Alpha is ignored by every metric.
    Rgba8,
    /// 8-bit grayscale (8 bpp).
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Which detector drives the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectionMode {
    /// Fade in/out detection against a fixed intensity floor.
    Threshold,
    /// Fast-cut detection from the HSV difference between adjacent frames.
    #[default]
    Content,
}

impl DetectionMode {
    /// Name used on the command line and in stats file headers.
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMode::Threshold => "threshold",
            DetectionMode::Content => "content",
        }
    }
}

impl Display for DetectionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = SceneCutError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "threshold" | "detect-threshold" => Ok(DetectionMode::Threshold),
            "content" | "detect-content" => Ok(DetectionMode::Content),
            other => Err(SceneCutError::config(
                "mode",
                format!("unknown detection mode `{other}` (expected threshold or content)"),
            )),
        }
    }
}

/// Immutable configuration of a detector.
///
/// Defaults depend on the mode: threshold mode starts from an intensity
/// floor of 12, 95% dark pixels, a sampling stride of 8 and no fade bias;
/// content mode starts from a score threshold of 30. Both default to a
/// minimum scene length of 15 frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Active detector.
    pub mode: DetectionMode,
    /// Score at which a cut (content) or darkness (threshold) is declared.
    ///
    /// Threshold mode compares 8-bit intensities (0–255); content mode
    /// compares the average HSV delta.
    pub threshold: f64,
    /// Minimum number of frames between two emitted boundaries.
    pub min_scene_len: u64,
    /// Threshold mode: percentage (0–100) of sampled pixels that must be at
    /// or below `threshold` for a frame to count as dark.
    pub min_percent: f64,
    /// Sampling stride, in pixels, for intensity sampling.
    pub block_size: u32,
    /// Threshold mode: where a fade's split frame lands between the
    /// fade-out (−1) and the fade-in (+1).
    pub fade_bias: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DetectionMode::default())
    }
}

impl DetectorConfig {
    /// Create a configuration with the defaults for `mode`.
    pub fn new(mode: DetectionMode) -> Self {
        let threshold = match mode {
            DetectionMode::Threshold => 12.0,
            DetectionMode::Content => 30.0,
        };
        Self {
            mode,
            threshold,
            min_scene_len: 15,
            min_percent: 95.0,
            block_size: 8,
            fade_bias: 0.0,
        }
    }

    /// Shorthand for `DetectorConfig::new(DetectionMode::Threshold)`.
    pub fn threshold_mode() -> Self {
        Self::new(DetectionMode::Threshold)
    }

    /// Shorthand for `DetectorConfig::new(DetectionMode::Content)`.
    pub fn content_mode() -> Self {
        Self::new(DetectionMode::Content)
    }

    /// Set the detection threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum scene length in frames.
    #[must_use]
    pub fn with_min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Set the dark-pixel percentage (threshold mode).
    #[must_use]
    pub fn with_min_percent(mut self, percent: f64) -> Self {
        self.min_percent = percent;
        self
    }

    /// Set the intensity sampling stride.
    #[must_use]
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the fade bias (threshold mode).
    #[must_use]
    pub fn with_fade_bias(mut self, bias: f64) -> Self {
        self.fade_bias = bias;
        self
    }

    /// `min_percent` as a fraction in [0, 1].
    pub(crate) fn min_fraction(&self) -> f64 {
        self.min_percent / 100.0
    }

    /// Check every option against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::ConfigValidation`] naming the first
    /// offending option.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SceneCutError::config(
                "threshold",
                format!("must be a non-negative number, got {}", self.threshold),
            ));
        }
        if self.mode == DetectionMode::Threshold && self.threshold > 255.0 {
            return Err(SceneCutError::config(
                "threshold",
                format!("intensity threshold must be within 0-255, got {}", self.threshold),
            ));
        }
        if self.min_scene_len < 1 {
            return Err(SceneCutError::config("min_scene_len", "must be at least 1 frame"));
        }
        if !(0.0..=100.0).contains(&self.min_percent) {
            return Err(SceneCutError::config(
                "min_percent",
                format!("must be within 0-100, got {}", self.min_percent),
            ));
        }
        if self.block_size < 1 {
            return Err(SceneCutError::config("block_size", "must be at least 1"));
        }
        if !(-1.0..=1.0).contains(&self.fade_bias) {
            return Err(SceneCutError::config(
                "fade_bias",
                format!("must be within -1.0 and 1.0, got {}", self.fade_bias),
            ));
        }
        Ok(())
    }
}

/// Operational settings for one analysis pass.
///
/// All fields have defaults: no progress callback, no cancellation, a
/// progress batch size of 1, no stats file.
#[derive(Clone)]
pub struct AnalysisOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
    /// Stats file to replay from (when it exists) and record to.
    pub(crate) stats_path: Option<PathBuf>,
    /// Whether processed rows are written back to `stats_path`.
    pub(crate) record_stats: bool,
}

impl Debug for AnalysisOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("stats_path", &self.stats_path)
            .field("record_stats", &self.record_stats)
            .finish()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            stats_path: None,
            record_stats: true,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the analyzer stops pulling frames and
    /// finalizes the scenes found so far.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Use `path` as the stats file.
    ///
    /// An existing file whose header matches the detector is replayed
    /// instead of recomputing metrics. Unless disabled with
    /// [`with_stats_recording`](AnalysisOptions::with_stats_recording), the
    /// file is rewritten with every processed row when the pass ends.
    #[must_use]
    pub fn with_stats_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.stats_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable writing the stats file back. Defaults to `true`.
    #[must_use]
    pub fn with_stats_recording(mut self, record: bool) -> Self {
        self.record_stats = record;
        self
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
