use crate::config::DetectorConfig;
use crate::metrics::MetricRow;

use super::{BoundaryKind, SceneBoundary, respects_min_scene_len};

/// Fast-cut detector over adjacent-frame HSV differences.
///
/// A cut is declared at a frame whose `content_val` is strictly greater than
/// the threshold, provided at least `min_scene_len` frames have passed since
/// the previous cut. A score exactly equal to the threshold never cuts.
#[derive(Debug, Clone)]
pub struct ContentDetector {
    threshold: f64,
    min_scene_len: u64,
    seen_first: bool,
    last_cut: Option<u64>,
}

impl ContentDetector {
    /// Create a detector from `config.threshold` and `config.min_scene_len`.
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            threshold: config.threshold,
            min_scene_len: config.min_scene_len,
            seen_first: false,
            last_cut: None,
        }
    }

    /// Feed one row.
    pub fn process(&mut self, row: &MetricRow, events: &mut Vec<SceneBoundary>) {
        // The first row is the extractor's sentinel; it has no predecessor.
        if !self.seen_first {
            self.seen_first = true;
            return;
        }

        let content_val = row.get("content_val");
        debug_assert!(content_val.is_some(), "content row without `content_val`");
        let content_val = content_val.unwrap_or(0.0);
        if content_val <= self.threshold {
            return;
        }

        if respects_min_scene_len(self.last_cut, row.frame(), self.min_scene_len) {
            log::trace!("cut at frame {} (content_val {content_val:.3})", row.frame());
            events.push(SceneBoundary::new(row.frame(), BoundaryKind::Cut));
            self.last_cut = Some(row.frame());
        } else {
            log::trace!(
                "cut at frame {} suppressed, previous cut at {:?}",
                row.frame(),
                self.last_cut
            );
        }
    }

    /// End-of-stream. Cuts are emitted as they are found, so nothing is pending.
    pub fn finish(&mut self, _events: &mut Vec<SceneBoundary>) {}
}
