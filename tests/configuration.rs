//! DetectorConfig, AnalysisOptions, and DetectionMode tests.

use std::sync::Arc;

use scenecut::{
    AnalysisOptions, CancellationToken, DetectionMode, DetectorConfig, PixelFormat,
    ProgressCallback, ProgressInfo, SceneAnalyzer, SceneCutError,
};

fn rejected_option(config: &DetectorConfig) -> &'static str {
    match config.validate() {
        Err(SceneCutError::ConfigValidation { option, .. }) => option,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// ── DetectorConfig defaults ────────────────────────────────────────

#[test]
fn threshold_defaults() {
    let config = DetectorConfig::threshold_mode();
    assert_eq!(config.mode, DetectionMode::Threshold);
    assert_eq!(config.threshold, 12.0);
    assert_eq!(config.min_scene_len, 15);
    assert_eq!(config.min_percent, 95.0);
    assert_eq!(config.block_size, 8);
    assert_eq!(config.fade_bias, 0.0);
    assert!(config.validate().is_ok());
}

#[test]
fn content_defaults() {
    let config = DetectorConfig::content_mode();
    assert_eq!(config.mode, DetectionMode::Content);
    assert_eq!(config.threshold, 30.0);
    assert_eq!(config.min_scene_len, 15);
    assert!(config.validate().is_ok());
}

#[test]
fn default_config_is_content() {
    assert_eq!(DetectorConfig::default(), DetectorConfig::content_mode());
}

#[test]
fn builder_sets_every_field() {
    let config = DetectorConfig::threshold_mode()
        .with_threshold(20.0)
        .with_min_scene_len(48)
        .with_min_percent(80.0)
        .with_block_size(4)
        .with_fade_bias(-0.25);

    assert_eq!(config.threshold, 20.0);
    assert_eq!(config.min_scene_len, 48);
    assert_eq!(config.min_percent, 80.0);
    assert_eq!(config.block_size, 4);
    assert_eq!(config.fade_bias, -0.25);
    assert!(config.validate().is_ok());
}

// ── Validation ─────────────────────────────────────────────────────

#[test]
fn out_of_range_values_are_rejected() {
    let base = DetectorConfig::threshold_mode();

    assert_eq!(rejected_option(&base.clone().with_threshold(-1.0)), "threshold");
    assert_eq!(rejected_option(&base.clone().with_threshold(f64::NAN)), "threshold");
    assert_eq!(rejected_option(&base.clone().with_threshold(256.0)), "threshold");
    assert_eq!(rejected_option(&base.clone().with_min_scene_len(0)), "min_scene_len");
    assert_eq!(rejected_option(&base.clone().with_min_percent(100.5)), "min_percent");
    assert_eq!(rejected_option(&base.clone().with_min_percent(-1.0)), "min_percent");
    assert_eq!(rejected_option(&base.clone().with_block_size(0)), "block_size");
    assert_eq!(rejected_option(&base.clone().with_fade_bias(1.5)), "fade_bias");
    assert_eq!(rejected_option(&base.with_fade_bias(-1.01)), "fade_bias");
}

#[test]
fn content_threshold_has_no_upper_bound() {
    let config = DetectorConfig::content_mode().with_threshold(300.0);
    assert!(config.validate().is_ok());
}

#[test]
fn boundary_values_are_accepted() {
    let config = DetectorConfig::threshold_mode()
        .with_threshold(255.0)
        .with_min_scene_len(1)
        .with_min_percent(0.0)
        .with_block_size(1)
        .with_fade_bias(1.0);
    assert!(config.validate().is_ok());
    assert!(config.with_min_percent(100.0).with_fade_bias(-1.0).validate().is_ok());
}

#[test]
fn analyzer_validates_config() {
    let error = SceneAnalyzer::new(DetectorConfig::content_mode().with_min_scene_len(0)).unwrap_err();
    assert!(matches!(
        error,
        SceneCutError::ConfigValidation {
            option: "min_scene_len",
            ..
        }
    ));
}

// ── DetectionMode ──────────────────────────────────────────────────

#[test]
fn detection_mode_parses_names_and_aliases() {
    assert_eq!("threshold".parse::<DetectionMode>().unwrap(), DetectionMode::Threshold);
    assert_eq!("detect-content".parse::<DetectionMode>().unwrap(), DetectionMode::Content);
    assert_eq!(" Content ".parse::<DetectionMode>().unwrap(), DetectionMode::Content);
    assert!("histogram".parse::<DetectionMode>().is_err());
}

#[test]
fn detection_mode_display() {
    assert_eq!(DetectionMode::Threshold.to_string(), "threshold");
    assert_eq!(DetectionMode::Content.as_str(), "content");
}

// ── PixelFormat ────────────────────────────────────────────────────

#[test]
fn pixel_format_channels() {
    assert_eq!(PixelFormat::default(), PixelFormat::Rgb8);
    assert_eq!(PixelFormat::Rgb8.channels(), 3);
    assert_eq!(PixelFormat::Rgba8.channels(), 4);
    assert_eq!(PixelFormat::Gray8.channels(), 1);
}

// ── AnalysisOptions builder ────────────────────────────────────────

struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

#[test]
fn options_defaults() {
    let options = AnalysisOptions::new();
    let debug = format!("{options:?}");
    assert!(debug.contains("AnalysisOptions"));
    assert!(debug.contains("has_cancellation: false"));
    assert!(debug.contains("batch_size: 1"));
    assert!(debug.contains("stats_path: None"));
    assert!(debug.contains("record_stats: true"));
}

#[test]
fn options_with_batch_size_clamps_zero() {
    let options = AnalysisOptions::new().with_batch_size(0);
    assert!(format!("{options:?}").contains("batch_size: 1"));
}

#[test]
fn options_builder_chain() {
    let options = AnalysisOptions::new()
        .with_progress(Arc::new(Silent))
        .with_cancellation(CancellationToken::new())
        .with_batch_size(25)
        .with_stats_file("video.stats.csv")
        .with_stats_recording(false);

    let debug = format!("{options:?}");
    assert!(debug.contains("has_cancellation: true"));
    assert!(debug.contains("batch_size: 25"));
    assert!(debug.contains("video.stats.csv"));
    assert!(debug.contains("record_stats: false"));
}

#[test]
fn analyzer_exposes_config_and_options() {
    let analyzer = SceneAnalyzer::new(DetectorConfig::threshold_mode())
        .unwrap()
        .with_options(AnalysisOptions::new().with_batch_size(7));

    assert_eq!(analyzer.config().mode, DetectionMode::Threshold);
    assert!(format!("{:?}", analyzer.options()).contains("batch_size: 7"));
}
