//! Decode-ahead source tests.

use std::time::Duration;

use scenecut::{
    DetectorConfig, Frame, FrameSource, MemoryFrameSource, PixelFormat, PrefetchSource,
    SceneAnalyzer, SceneCutError,
};

fn frames(levels: &[u8]) -> Vec<Frame> {
    levels
        .iter()
        .enumerate()
        .map(|(index, &level)| {
            Frame::new(
                index as u64,
                Duration::ZERO,
                4,
                4,
                PixelFormat::Gray8,
                vec![level; 16],
            )
        })
        .collect()
}

fn levels() -> Vec<u8> {
    (0..60).map(|index| if index < 30 { 10 } else { 240 }).collect()
}

#[test]
fn prefetch_yields_frames_in_order() {
    let source = MemoryFrameSource::new(frames(&levels()), 25.0);
    let prefetch = PrefetchSource::new(source, 4).unwrap();

    assert_eq!(prefetch.properties().frame_count, 60);
    assert_eq!(prefetch.properties().frames_per_second, 25.0);

    let indices: Vec<u64> = prefetch.map(|frame| frame.unwrap().index()).collect();
    assert_eq!(indices, (0..60).collect::<Vec<_>>());
}

#[test]
fn prefetch_matches_direct_analysis() {
    let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();

    let direct = analyzer
        .analyze(&mut MemoryFrameSource::new(frames(&levels()), 25.0))
        .unwrap();
    let mut prefetch =
        PrefetchSource::new(MemoryFrameSource::new(frames(&levels()), 25.0), 2).unwrap();
    let prefetched = analyzer.analyze(&mut prefetch).unwrap();

    assert_eq!(prefetched.scenes, direct.scenes);
    assert_eq!(prefetched.scenes.cut_frames(), vec![30]);
}

#[test]
fn queue_is_bounded() {
    let prefetch = PrefetchSource::new(MemoryFrameSource::new(frames(&levels()), 25.0), 3).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(prefetch.queued() <= 3);
}

#[test]
fn dropping_early_stops_the_producer() {
    let mut prefetch =
        PrefetchSource::new(MemoryFrameSource::new(frames(&levels()), 25.0), 1).unwrap();
    assert!(prefetch.next().is_some());
    // Drop joins the producer; this must not hang.
    drop(prefetch);
}

#[test]
fn factory_error_is_returned() {
    let result = PrefetchSource::spawn(
        || -> Result<MemoryFrameSource, SceneCutError> {
            Err(SceneCutError::NoFrames("missing".into()))
        },
        4,
    );
    assert!(matches!(result, Err(SceneCutError::NoFrames(_))));
}

#[test]
fn factory_builds_source_on_producer_thread() {
    let prefetch = PrefetchSource::spawn(
        || Ok(MemoryFrameSource::new(frames(&[0, 0, 0]), 30.0)),
        2,
    )
    .unwrap();

    assert_eq!(prefetch.properties().frame_count, 3);
    assert_eq!(prefetch.count(), 3);
}

#[test]
fn source_error_ends_the_stream() {
    let mut bad = frames(&[0, 0, 0, 0]);
    bad[1] = Frame::new(1, Duration::ZERO, 0, 0, PixelFormat::Gray8, Vec::new());
    let analyzer = SceneAnalyzer::new(DetectorConfig::content_mode()).unwrap();
    let mut prefetch = PrefetchSource::new(MemoryFrameSource::new(bad, 25.0), 2).unwrap();

    let error = analyzer.analyze(&mut prefetch).unwrap_err();
    assert!(matches!(error, SceneCutError::FrameDecode { frame_index: 1, .. }));
}
