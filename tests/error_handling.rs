//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

use std::time::Duration;

use scenecut::{
    DetectorConfig, Frame, FrameTimecode, HsvDeltaExtractor, IntensitySampler, MemoryFrameSource,
    PixelFormat, SceneAnalyzer, SceneCutError, StatsFile,
};

fn gray(index: u64, width: u32, height: u32) -> Frame {
    Frame::new(
        index,
        Duration::ZERO,
        width,
        height,
        PixelFormat::Gray8,
        vec![0; (width * height) as usize],
    )
}

#[test]
fn zero_size_frame() {
    let error = gray(4, 0, 10).validate().unwrap_err();
    let error_message = error.to_string();
    assert!(
        error_message.contains("Malformed frame 4"),
        "Error message should name the frame: {error_message}",
    );
}

#[test]
fn short_buffer() {
    let frame = Frame::new(0, Duration::ZERO, 2, 2, PixelFormat::Rgba8, vec![0; 12]);
    let result = IntensitySampler::new(1, 12.0).extract(&frame);
    assert!(matches!(
        result,
        Err(SceneCutError::FrameDecode { frame_index: 0, .. })
    ));
}

#[test]
fn frame_size_change_mid_stream() {
    let mut extractor = HsvDeltaExtractor::new();
    extractor.extract(&gray(0, 4, 4)).unwrap();

    let error = extractor.extract(&gray(1, 8, 8)).unwrap_err();
    let error_message = error.to_string();
    assert!(
        error_message.contains("frame size changed"),
        "Error should mention the size change: {error_message}",
    );
}

#[test]
fn frame_sequence_gap() {
    let frames = vec![gray(0, 2, 2), gray(2, 2, 2)];
    let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();
    let error = analyzer
        .analyze(&mut MemoryFrameSource::new(frames, 24.0))
        .unwrap_err();

    assert_eq!(
        error.to_string(),
        "Frame sequence broken: expected frame 1, got frame 2"
    );
}

#[test]
fn invalid_configuration_names_the_option() {
    let error = DetectorConfig::threshold_mode()
        .with_fade_bias(2.0)
        .validate()
        .unwrap_err();
    let error_message = error.to_string();
    assert!(
        error_message.contains("`fade_bias`"),
        "Error should name the option: {error_message}",
    );
}

#[test]
fn invalid_timecode() {
    let error = FrameTimecode::parse("12:xx:00", 24.0).unwrap_err();
    assert!(matches!(
        error,
        SceneCutError::ConfigValidation {
            option: "timecode",
            ..
        }
    ));
}

#[test]
fn corrupt_stats_file() {
    let error = StatsFile::read("Frame Number,Timecode\n".as_bytes()).unwrap_err();
    let error_message = error.to_string();
    assert!(
        error_message.starts_with("Stats file is corrupt"),
        "Error should mention corruption: {error_message}",
    );
}

#[test]
fn open_nonexistent_stats_file() {
    let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();
    let result = analyzer.analyze_stats_file("this_file_does_not_exist.stats.csv");
    assert!(matches!(result, Err(SceneCutError::IoError(_))));
}

#[test]
fn cancelled_error_message() {
    assert_eq!(SceneCutError::Cancelled.to_string(), "Operation cancelled");
}
