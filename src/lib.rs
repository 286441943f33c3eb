//! # scenecut
//!
//! Scene boundary detection for video: find hard cuts and fades to black,
//! assemble them into a contiguous scene list, and record per-frame metrics
//! so a video can be re-scored with new settings without decoding it again.
//!
//! The engine consumes any [`FrameSource`], so it works the same on decoded
//! video files, image sequences, or frames held in memory.
//!
//! ## Quick Start
//!
//! ### Detect Cuts in a Video File
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # {
//! use scenecut::{DetectorConfig, SceneAnalyzer, VideoFileSource};
//!
//! let mut source = VideoFileSource::open("input.mp4").unwrap();
//! let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();
//! let report = analyzer.analyze(&mut source).unwrap();
//!
//! for scene in &report.scenes {
//!     println!("Scene {}: {} - {}", scene.number, scene.start, scene.end);
//! }
//! # }
//! ```
//!
//! ### Detect Fades with a Reusable Stats File
//!
//! ```no_run
//! use scenecut::{AnalysisOptions, DetectorConfig, ImageSequenceSource, SceneAnalyzer};
//!
//! let config = DetectorConfig::threshold_mode()
//!     .with_threshold(16.0)
//!     .with_fade_bias(0.5);
//! let options = AnalysisOptions::new().with_stats_file("frames.stats.csv");
//!
//! let mut source = ImageSequenceSource::open("frames/", 24.0).unwrap();
//! let report = SceneAnalyzer::new(config)
//!     .unwrap()
//!     .with_options(options)
//!     .analyze(&mut source)
//!     .unwrap();
//! report.scenes.save_csv("scenes.csv").unwrap();
//! ```
//!
//! ## Features
//!
//! - **Content detection**: cuts where the HSV difference between adjacent
//!   frames exceeds a threshold
//! - **Threshold detection**: fades to and from black, with a configurable
//!   split position inside the dark segment
//! - **Minimum scene length** enforced by both detectors
//! - **Stats files**: record metrics once, replay them on later passes,
//!   resume from a partial file
//! - **Scene lists** as CSV, JSON, or in-memory timecodes
//! - **Progress & cancellation**: cooperative callbacks and
//!   `CancellationToken`; a cancelled pass still yields a valid scene list
//! - **Prefetching**: decode on a background thread through a bounded queue
//! - **Splitting**: write one clip per scene with `ffmpeg` or `mkvmerge`
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | `VideoFileSource` decodes video files via `ffmpeg-next` |
//! | `rayon` | `analyze_batch()` analyzes many streams in parallel |
//! | `full` | Enables all of the above |

pub mod analysis;
pub mod assembler;
#[cfg(feature = "rayon")]
pub mod batch;
pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod image_sequence;
pub mod metrics;
pub mod prefetch;
pub mod progress;
pub mod split;
pub mod stats;
pub mod timecode;
#[cfg(feature = "ffmpeg")]
pub mod video_source;

pub use analysis::{AnalysisOutcome, AnalysisReport, SceneAnalyzer};
pub use assembler::{SCENE_LIST_HEADER, Scene, SceneAssembler, SceneList};
#[cfg(feature = "rayon")]
pub use batch::{BatchJob, analyze_batch};
pub use config::{AnalysisOptions, DetectionMode, DetectorConfig, PixelFormat};
pub use detector::{
    BoundaryKind, ContentDetector, Detector, FadeState, SceneBoundary, ThresholdDetector,
};
pub use error::{Result, SceneCutError};
pub use frame::{Frame, FrameSource, MemoryFrameSource, SourceProperties};
pub use image_sequence::ImageSequenceSource;
pub use metrics::{
    CONTENT_METRIC_KEYS, HsvDeltaExtractor, IntensitySampler, MetricExtractor, MetricRow,
    THRESHOLD_METRIC_KEYS, metric_keys, rgb_to_hsv,
};
pub use prefetch::PrefetchSource;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use split::{SplitCommand, SplitMode, VideoSplitter};
pub use stats::{StatsFile, StatsHeader, StatsRow, sampling_signature};
pub use timecode::FrameTimecode;
#[cfg(feature = "ffmpeg")]
pub use video_source::VideoFileSource;
