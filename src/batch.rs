//! Parallel analysis of independent streams.
//!
//! Each stream still gets one sequential pass; [`analyze_batch`] only runs
//! the passes side by side on the [`rayon`] thread pool. Detector state is
//! never shared between passes.
//!
//! Available with the `rayon` feature.

use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::analysis::{AnalysisReport, SceneAnalyzer};
use crate::error::Result;
use crate::frame::FrameSource;

/// One stream of a batch, with its own stats file.
#[derive(Debug)]
pub struct BatchJob<S> {
    source: S,
    stats_path: Option<PathBuf>,
}

impl<S: FrameSource> BatchJob<S> {
    /// Analyze `source` without a stats file.
    pub fn new(source: S) -> Self {
        Self {
            source,
            stats_path: None,
        }
    }

    /// Replay from and record to `path` for this stream only.
    #[must_use]
    pub fn with_stats_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.stats_path = Some(path.as_ref().to_path_buf());
        self
    }
}

/// Analyze every job with the configuration and options of `analyzer`.
///
/// A stats file configured on `analyzer` itself is ignored, since passes
/// cannot share one; attach per-stream files with
/// [`BatchJob::with_stats_file`]. Results are returned in job order.
pub fn analyze_batch<S>(analyzer: &SceneAnalyzer, jobs: Vec<BatchJob<S>>) -> Vec<Result<AnalysisReport>>
where
    S: FrameSource + Send,
{
    if analyzer.options().stats_path.is_some() {
        log::warn!("Batch analysis ignores the analyzer's stats file; use per-job stats files");
    }
    log::debug!("Analyzing {} streams in parallel", jobs.len());

    jobs.into_par_iter()
        .map(|job| {
            let mut options = analyzer.options().clone();
            options.stats_path = job.stats_path;
            let pass = analyzer.clone().with_options(options);

            let mut source = job.source;
            pass.analyze(&mut source)
        })
        .collect()
}
