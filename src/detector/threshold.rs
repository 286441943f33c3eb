use crate::config::DetectorConfig;
use crate::metrics::MetricRow;

use super::{BoundaryKind, SceneBoundary, respects_min_scene_len};

/// Which side of the intensity floor the last frame was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Fewer than `min_percent` of the sampled pixels are dark.
    AboveThreshold,
    /// At least `min_percent` of the sampled pixels are dark.
    BelowThreshold,
}

/// A fade-out waiting for its fade-in.
#[derive(Debug, Clone, Copy)]
struct PendingFade {
    /// First dark frame.
    frame: u64,
    /// The stream started dark; there is no outgoing scene to end.
    leading: bool,
}

/// Fade detector with hysteresis on the dark-pixel fraction.
///
/// A fade to black followed by a fade back in yields one split frame between
/// the first dark frame (`f_out`) and the first bright frame after it
/// (`f_in`):
///
/// ```text
/// split = f_out + floor((f_in - f_out) * (1 + fade_bias) / 2)
/// ```
///
/// A `FadeOut` and a `FadeIn` boundary are both reported at the split. A
/// dark segment still open at end-of-stream stays in the final scene.
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    min_fraction: f64,
    min_scene_len: u64,
    fade_bias: f64,
    state: Option<FadeState>,
    pending: Option<PendingFade>,
    last_split: Option<u64>,
}

impl ThresholdDetector {
    /// Create a detector from `config.min_percent`, `config.min_scene_len`
    /// and `config.fade_bias`.
    ///
    /// `config.threshold` is applied by the metric extractor when it counts
    /// dark pixels.
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            min_fraction: config.min_fraction(),
            min_scene_len: config.min_scene_len,
            fade_bias: config.fade_bias,
            state: None,
            pending: None,
            last_split: None,
        }
    }

    /// Current state, `None` before the first row.
    pub fn state(&self) -> Option<FadeState> {
        self.state
    }

    /// Feed one row.
    pub fn process(&mut self, row: &MetricRow, events: &mut Vec<SceneBoundary>) {
        let frame = row.frame();
        let dark_fraction = row.get("dark_fraction");
        debug_assert!(dark_fraction.is_some(), "threshold row without `dark_fraction`");
        let is_dark = dark_fraction.unwrap_or(0.0) >= self.min_fraction;

        match (self.state, is_dark) {
            (None, true) => {
                self.state = Some(FadeState::BelowThreshold);
                self.pending = Some(PendingFade {
                    frame: 0,
                    leading: true,
                });
            }
            (None, false) => self.state = Some(FadeState::AboveThreshold),
            (Some(FadeState::AboveThreshold), true) => {
                log::trace!("fade-out begins at frame {frame}");
                self.state = Some(FadeState::BelowThreshold);
                self.pending = Some(PendingFade {
                    frame,
                    leading: false,
                });
            }
            (Some(FadeState::BelowThreshold), false) => {
                self.state = Some(FadeState::AboveThreshold);
                if let Some(pending) = self.pending.take() {
                    self.emit_fade(pending, frame, events);
                }
            }
            // Same-state frames never emit.
            (Some(FadeState::AboveThreshold), false) | (Some(FadeState::BelowThreshold), true) => {}
        }
    }

    /// End-of-stream: a trailing dark segment belongs to the final scene.
    pub fn finish(&mut self, _events: &mut Vec<SceneBoundary>) {
        if let Some(pending) = self.pending.take() {
            log::trace!(
                "stream ended below threshold, dropping fade-out at frame {}",
                pending.frame
            );
        }
    }

    fn emit_fade(&mut self, pending: PendingFade, fade_in: u64, events: &mut Vec<SceneBoundary>) {
        let split = self.split_frame(pending.frame, fade_in);

        if pending.leading && split == 0 {
            return;
        }
        if !respects_min_scene_len(self.last_split, split, self.min_scene_len) {
            log::trace!(
                "fade at frame {split} suppressed, previous split at {:?}",
                self.last_split
            );
            return;
        }

        log::trace!(
            "fade {}->{fade_in} split at frame {split}",
            pending.frame
        );
        if !pending.leading {
            events.push(SceneBoundary::new(split, BoundaryKind::FadeOut));
        }
        events.push(SceneBoundary::new(split, BoundaryKind::FadeIn));
        self.last_split = Some(split);
    }

    fn split_frame(&self, fade_out: u64, fade_in: u64) -> u64 {
        let span = fade_in.saturating_sub(fade_out) as f64;
        let offset = (span * (1.0 + self.fade_bias) / 2.0).floor() as u64;
        fade_out + offset.min(fade_in - fade_out)
    }
}
