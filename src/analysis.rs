//! The analysis pass.
//!
//! [`SceneAnalyzer`] drives one sequential pass over a [`FrameSource`]:
//! metrics are extracted from each frame (or replayed from a stats file),
//! fed to the configured [`Detector`], and the emitted boundaries are
//! assembled into a [`SceneList`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use scenecut::{DetectorConfig, Frame, MemoryFrameSource, PixelFormat, SceneAnalyzer};
//!
//! let frames = (0..40u64)
//!     .map(|index| {
//!         let level = if index < 20 { 0 } else { 255 };
//!         Frame::new(index, Duration::ZERO, 4, 4, PixelFormat::Gray8, vec![level; 16])
//!     })
//!     .collect();
//! let mut source = MemoryFrameSource::new(frames, 25.0);
//!
//! let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();
//! let report = analyzer.analyze(&mut source).unwrap();
//!
//! assert_eq!(report.scenes.cut_frames(), vec![20]);
//! ```

use std::path::Path;

use serde_json::{Value, json};

use crate::assembler::{SceneAssembler, SceneList};
use crate::config::{AnalysisOptions, DetectionMode, DetectorConfig};
use crate::detector::{Detector, SceneBoundary};
use crate::error::{Result, SceneCutError};
use crate::frame::FrameSource;
use crate::metrics::{MetricExtractor, MetricRow};
use crate::progress::{OperationType, ProgressTracker};
use crate::stats::{StatsFile, StatsHeader};

/// Result of a completed pass.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Detector mode of the pass.
    pub mode: DetectionMode,
    /// The assembled scenes.
    pub scenes: SceneList,
    /// Every boundary the detector emitted, in order.
    pub boundaries: Vec<SceneBoundary>,
    /// Frames that went through the detector.
    pub frames_processed: u64,
    /// How many of those came from a stats file instead of the source.
    pub frames_replayed: u64,
    /// The rows of this pass, when recording was enabled.
    pub stats: Option<StatsFile>,
    /// The pass was stopped by its cancellation token.
    pub cancelled: bool,
}

impl AnalysisReport {
    /// Machine-readable summary for JSON output.
    pub fn to_json(&self) -> Value {
        let mut value = self.scenes.to_json();
        if let Value::Object(map) = &mut value {
            map.insert("detector".to_string(), json!(self.mode.as_str()));
            map.insert("frames_processed".to_string(), json!(self.frames_processed));
            map.insert("frames_replayed".to_string(), json!(self.frames_replayed));
            map.insert("cancelled".to_string(), json!(self.cancelled));
            map.insert(
                "boundaries".to_string(),
                self.boundaries
                    .iter()
                    .map(|boundary| json!({ "frame": boundary.frame, "kind": boundary.kind.as_str() }))
                    .collect(),
            );
        }
        value
    }
}

/// A pass that may have stopped early.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Scenes assembled from the frames processed before the pass stopped.
    ///
    /// `None` when the pass failed before the first frame or the partial
    /// scene list itself could not be assembled.
    pub report: Option<AnalysisReport>,
    /// The error that ended the pass, if any.
    pub error: Option<SceneCutError>,
}

impl AnalysisOutcome {
    /// `true` when the pass ran to completion (or was cancelled) without an
    /// error. Scenes from an untrustworthy outcome should be discarded.
    pub fn is_trustworthy(&self) -> bool {
        self.error.is_none() && self.report.is_some()
    }

    /// Convert into the report, or the error that ended the pass.
    pub fn into_result(self) -> Result<AnalysisReport> {
        match (self.report, self.error) {
            (_, Some(error)) => Err(error),
            (Some(report), None) => Ok(report),
            (None, None) => Err(SceneCutError::AssemblyInvariantViolation(
                "pass ended without a scene list".to_string(),
            )),
        }
    }
}

/// Runs analysis passes with one detector configuration.
#[derive(Debug, Clone)]
pub struct SceneAnalyzer {
    config: DetectorConfig,
    options: AnalysisOptions,
}

impl SceneAnalyzer {
    /// Create an analyzer for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::ConfigValidation`] if any option is out of
    /// range.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            options: AnalysisOptions::default(),
        })
    }

    /// Attach progress, cancellation and stats-file options.
    #[must_use]
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// The detector configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The operational options.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Run a full pass over `source`.
    ///
    /// Cancellation is not an error: the report holds the scenes found so
    /// far with [`cancelled`](AnalysisReport::cancelled) set.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a malformed or out-of-order frame, an
    /// unusable frame rate, or a failure writing the stats file.
    pub fn analyze<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<AnalysisReport> {
        self.analyze_partial(source).into_result()
    }

    /// Run a full pass over `source`, keeping the scenes assembled before a
    /// fatal error.
    pub fn analyze_partial<S: FrameSource + ?Sized>(&self, source: &mut S) -> AnalysisOutcome {
        let properties = source.properties().clone();
        if let Err(error) = properties.validate() {
            return AnalysisOutcome {
                report: None,
                error: Some(error),
            };
        }

        let frames_per_second = properties.frames_per_second;
        let header = StatsHeader::for_config(&self.config, frames_per_second);
        let replay = self.replay_rows(&header);

        log::debug!(
            "Analyzing about {} frames at {frames_per_second:.3} fps with the {} detector ({} rows replayable)",
            properties.frame_count,
            self.config.mode,
            replay.len()
        );

        // The advertised count only sizes progress reports; the stream ends
        // when the source does.
        let mut pass = Pass::new(&self.config, &self.options, header, properties.frame_count);
        let error = pass.decode(source, replay).err();

        let outcome = pass.finish(frames_per_second, error);
        if outcome.error.is_none() {
            if let (Some(path), Some(report)) = (&self.options.stats_path, &outcome.report) {
                if let Some(stats) = &report.stats {
                    if let Err(error) = stats.save(path) {
                        return AnalysisOutcome {
                            report: outcome.report,
                            error: Some(error),
                        };
                    }
                }
            }
        }
        outcome
    }

    /// Re-score a stats file without any frame source.
    ///
    /// The file's mode and sampling signature must match this analyzer's
    /// configuration; its frame rate is taken as-is. Nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::StatsReplayMismatch`] if the file was
    /// recorded with incompatible settings.
    pub fn analyze_stats(&self, stats: &StatsFile) -> Result<AnalysisReport> {
        let frames_per_second = stats.header().frames_per_second();
        let header = StatsHeader::for_config(&self.config, frames_per_second);
        let rows = stats.replay_plan(&header)?;
        let frame_count = rows.len() as u64;

        let options = self.options.clone().with_stats_recording(false);
        let mut pass = Pass::new(&self.config, &options, header, frame_count);
        let error = pass.replay(rows).err();
        pass.finish(frames_per_second, error).into_result()
    }

    /// Convenience for [`analyze_stats`](SceneAnalyzer::analyze_stats) on a
    /// file path.
    pub fn analyze_stats_file<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let stats = StatsFile::load(path)?;
        self.analyze_stats(&stats)
    }

    /// Rows of the configured stats file usable for this pass. Any problem
    /// with the file falls back to full extraction.
    fn replay_rows(&self, header: &StatsHeader) -> Vec<MetricRow> {
        let Some(path) = &self.options.stats_path else {
            return Vec::new();
        };
        if !path.exists() {
            log::debug!("No stats file at {}, computing all metrics", path.display());
            return Vec::new();
        }

        match StatsFile::load(path).and_then(|file| file.replay_plan(header)) {
            Ok(rows) => rows,
            Err(error) => {
                log::warn!(
                    "Ignoring stats file {}: {error}. Metrics will be recomputed",
                    path.display()
                );
                Vec::new()
            }
        }
    }
}

/// Mutable state of one pass.
struct Pass<'a> {
    options: &'a AnalysisOptions,
    extractor: MetricExtractor,
    detector: Detector,
    assembler: SceneAssembler,
    boundaries: Vec<SceneBoundary>,
    events: Vec<SceneBoundary>,
    /// Boundaries held back until the stream is known to reach
    /// `min_scene_len` frames. Shorter streams are a single scene.
    pending: Option<Vec<SceneBoundary>>,
    min_scene_len: u64,
    recorder: Option<StatsFile>,
    tracker: ProgressTracker,
    frames_processed: u64,
    frames_replayed: u64,
    cancelled: bool,
}

impl<'a> Pass<'a> {
    fn new(
        config: &DetectorConfig,
        options: &'a AnalysisOptions,
        header: StatsHeader,
        frame_count: u64,
    ) -> Self {
        Self {
            options,
            extractor: MetricExtractor::new(config),
            detector: Detector::new(config),
            assembler: SceneAssembler::new(),
            boundaries: Vec::new(),
            events: Vec::new(),
            pending: Some(Vec::new()),
            min_scene_len: config.min_scene_len,
            recorder: options.record_stats.then(|| StatsFile::new(header)),
            tracker: ProgressTracker::new(
                options.progress.clone(),
                OperationType::StatsReplay,
                Some(frame_count),
                options.batch_size,
            ),
            frames_processed: 0,
            frames_replayed: 0,
            cancelled: false,
        }
    }

    fn check_cancelled(&mut self) -> bool {
        if !self.cancelled && self.options.is_cancelled() {
            log::info!("Analysis cancelled after {} frames", self.frames_processed);
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Feed stored rows with no frame source behind them.
    fn replay(&mut self, rows: Vec<MetricRow>) -> Result<()> {
        self.tracker.set_operation(OperationType::StatsReplay);
        for row in rows {
            if self.check_cancelled() {
                break;
            }
            self.feed(&row)?;
            self.frames_replayed += 1;
        }
        if self.frames_replayed > 0 {
            log::debug!("Replayed {} frames from the stats file", self.frames_replayed);
        }
        Ok(())
    }

    /// Pull every frame from `source`. Frames covered by `replay` take the
    /// stored row; the rest go through the extractor.
    fn decode<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        replay: Vec<MetricRow>,
    ) -> Result<()> {
        let covered = replay.len() as u64;
        let mut replay = replay.into_iter();
        if covered == 0 {
            self.tracker.set_operation(OperationType::SceneDetection);
        }
        let mut expected = 0u64;

        loop {
            if self.check_cancelled() {
                return Ok(());
            }
            let Some(frame) = source.next() else {
                break;
            };
            let frame = frame?;

            if frame.index() != expected {
                return Err(SceneCutError::FrameSequence {
                    expected,
                    found: frame.index(),
                });
            }
            expected += 1;

            if let Some(row) = replay.next() {
                debug_assert_eq!(row.frame(), frame.index());
                // The first extracted frame needs this one as lookback.
                if frame.index() + 1 == covered {
                    self.extractor.prime(&frame)?;
                }
                self.feed(&row)?;
                self.frames_replayed += 1;
                continue;
            }

            self.tracker.set_operation(OperationType::SceneDetection);
            let row = self.extractor.extract(&frame)?;
            self.feed(&row)?;
        }

        if self.frames_replayed > 0 {
            log::debug!("Replayed {} frames from the stats file", self.frames_replayed);
        }
        if self.frames_replayed < covered {
            log::debug!(
                "Stream ended at frame {}, ignoring {} further stats rows",
                self.frames_processed,
                covered - self.frames_replayed
            );
        }
        Ok(())
    }

    fn feed(&mut self, row: &MetricRow) -> Result<()> {
        self.detector.process(row, &mut self.events);
        self.route_events()?;

        if let Some(recorder) = &mut self.recorder {
            recorder.record(row);
        }
        self.frames_processed += 1;
        if self.frames_processed >= self.min_scene_len {
            self.release_pending()?;
        }
        self.tracker
            .advance(Some(row.frame()), self.assembler.closed_scenes() + 1);
        Ok(())
    }

    fn route_events(&mut self) -> Result<()> {
        for boundary in self.events.drain(..) {
            match &mut self.pending {
                Some(pending) => pending.push(boundary),
                None => {
                    self.assembler.push(boundary)?;
                    self.boundaries.push(boundary);
                }
            }
        }
        Ok(())
    }

    /// Hand held-back boundaries to the assembler; later ones go straight
    /// through.
    fn release_pending(&mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            for boundary in pending {
                self.assembler.push(boundary)?;
                self.boundaries.push(boundary);
            }
        }
        Ok(())
    }

    fn finish(mut self, frames_per_second: f64, error: Option<SceneCutError>) -> AnalysisOutcome {
        self.detector.finish(&mut self.events);
        let routed = self.route_events();
        if let Some(pending) = self.pending.take() {
            if !pending.is_empty() {
                log::debug!(
                    "Stream of {} frames is shorter than min_scene_len {}, reporting one scene",
                    self.frames_processed,
                    self.min_scene_len
                );
            }
        }
        let error = match (error, routed) {
            (Some(error), _) => Some(error),
            (None, Err(error)) => Some(error),
            (None, Ok(())) => None,
        };

        let (report, error) = match self.assembler.finish(self.frames_processed, frames_per_second) {
            Ok(scenes) => {
                self.tracker.finish(scenes.len());
                let report = AnalysisReport {
                    mode: self.detector.mode(),
                    scenes,
                    boundaries: self.boundaries,
                    frames_processed: self.frames_processed,
                    frames_replayed: self.frames_replayed,
                    stats: self.recorder,
                    cancelled: self.cancelled,
                };
                (Some(report), error)
            }
            Err(assembly_error) => (None, error.or(Some(assembly_error))),
        };

        match (&report, &error) {
            (Some(report), None) => log::info!(
                "Detected {} scenes in {} frames ({} replayed){}",
                report.scenes.len(),
                report.frames_processed,
                report.frames_replayed,
                if report.cancelled { ", cancelled" } else { "" }
            ),
            (_, Some(error)) => log::debug!("Analysis stopped: {error}"),
            (None, None) => {}
        }

        AnalysisOutcome { report, error }
    }
}
