//! Scene boundary detectors.
//!
//! A [`Detector`] consumes [`MetricRow`]s in frame order and pushes
//! [`SceneBoundary`] events as it finds them. Two variants exist:
//!
//! - [`ThresholdDetector`] tracks fades to and from black with a two-state
//!   machine and places one split per fade according to `fade_bias`.
//! - [`ContentDetector`] declares a hard cut whenever the HSV difference to
//!   the previous frame exceeds the threshold.
//!
//! Both enforce `min_scene_len` between emitted boundaries, and both keep all
//! of their run state inside the instance, so independent passes can run on
//! separate threads.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use scenecut::{BoundaryKind, Detector, DetectorConfig, MetricRow};
//!
//! let config = DetectorConfig::content_mode()
//!     .with_threshold(50.0)
//!     .with_min_scene_len(1);
//! let mut detector = Detector::new(&config);
//!
//! let mut events = Vec::new();
//! for (frame, score) in [0.0, 0.0, 0.0, 100.0, 0.0, 0.0].into_iter().enumerate() {
//!     let row = MetricRow::content(frame as u64, Duration::ZERO, score, score, score);
//!     detector.process(&row, &mut events);
//! }
//! detector.finish(&mut events);
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].frame, 3);
//! assert_eq!(events[0].kind, BoundaryKind::Cut);
//! ```

mod content;
mod threshold;

use std::fmt::{Display, Formatter, Result as FmtResult};

pub use content::ContentDetector;
pub use threshold::{FadeState, ThresholdDetector};

use crate::config::{DetectionMode, DetectorConfig};
use crate::metrics::{self, MetricRow};

/// Why a boundary was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Abrupt content change.
    Cut,
    /// End of the outgoing scene of a fade to black.
    FadeOut,
    /// Start of the incoming scene after a fade from black.
    FadeIn,
}

impl BoundaryKind {
    /// Lowercase name used in logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryKind::Cut => "cut",
            BoundaryKind::FadeOut => "fade-out",
            BoundaryKind::FadeIn => "fade-in",
        }
    }
}

impl Display for BoundaryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A frame at which one scene ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneBoundary {
    /// First frame of the new scene.
    pub frame: u64,
    /// What kind of transition produced it.
    pub kind: BoundaryKind,
}

impl SceneBoundary {
    /// Create a boundary.
    pub fn new(frame: u64, kind: BoundaryKind) -> Self {
        Self { frame, kind }
    }
}

/// The active detector of a pass.
#[derive(Debug, Clone)]
pub enum Detector {
    /// Fade detection against an intensity floor.
    Threshold(ThresholdDetector),
    /// Cut detection from adjacent-frame HSV differences.
    Content(ContentDetector),
}

impl Detector {
    /// Build the detector selected by `config.mode`.
    ///
    /// The configuration is assumed to be validated.
    pub fn new(config: &DetectorConfig) -> Self {
        match config.mode {
            DetectionMode::Threshold => Detector::Threshold(ThresholdDetector::new(config)),
            DetectionMode::Content => Detector::Content(ContentDetector::new(config)),
        }
    }

    /// The mode this detector implements.
    pub fn mode(&self) -> DetectionMode {
        match self {
            Detector::Threshold(_) => DetectionMode::Threshold,
            Detector::Content(_) => DetectionMode::Content,
        }
    }

    /// Metric keys the detector expects in each row.
    pub fn metric_keys(&self) -> &'static [&'static str] {
        metrics::metric_keys(self.mode())
    }

    /// Feed the next row; any boundaries found are pushed onto `events`.
    ///
    /// Rows must arrive in strictly increasing frame order.
    pub fn process(&mut self, row: &MetricRow, events: &mut Vec<SceneBoundary>) {
        match self {
            Detector::Threshold(detector) => detector.process(row, events),
            Detector::Content(detector) => detector.process(row, events),
        }
    }

    /// Signal end-of-stream.
    pub fn finish(&mut self, events: &mut Vec<SceneBoundary>) {
        match self {
            Detector::Threshold(detector) => detector.finish(events),
            Detector::Content(detector) => detector.finish(events),
        }
    }
}

/// `true` when a boundary at `frame` keeps `min_scene_len` frames of
/// distance from the previous one. The first boundary always passes.
fn respects_min_scene_len(last: Option<u64>, frame: u64, min_scene_len: u64) -> bool {
    last.is_none_or(|last| frame.saturating_sub(last) >= min_scene_len)
}
