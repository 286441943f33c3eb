//! Benchmarks for metric extraction and full analysis passes.
//!
//! Run with: cargo bench
//!
//! Frames are synthesized in memory, so no fixtures are needed.

use std::time::Duration;

use criterion::{BenchmarkId, Criterion};
use scenecut::{
    DetectorConfig, Frame, HsvDeltaExtractor, IntensitySampler, MemoryFrameSource, PixelFormat,
    SceneAnalyzer,
};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

/// A horizontal gradient whose brightness depends on `index`.
fn gradient_frame(index: u64) -> Frame {
    let mut data = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
    for _ in 0..HEIGHT {
        for x in 0..WIDTH {
            let base = (x * 255 / WIDTH) as u8;
            let shift = ((index * 37) % 256) as u8;
            data.extend_from_slice(&[base, base.wrapping_add(shift), 255 - base]);
        }
    }
    Frame::new(
        index,
        Duration::from_millis(index * 40),
        WIDTH,
        HEIGHT,
        PixelFormat::Rgb8,
        data,
    )
}

fn benchmark_intensity_sampling(criterion: &mut Criterion) {
    let frame = gradient_frame(0);
    let mut group = criterion.benchmark_group("intensity sampling");

    for block_size in [1_u32, 4, 8, 16] {
        let sampler = IntensitySampler::new(block_size, 12.0);
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &frame,
            |bencher, frame| {
                bencher.iter(|| sampler.extract(frame).unwrap());
            },
        );
    }

    group.finish();
}

fn benchmark_hsv_delta(criterion: &mut Criterion) {
    let frames = [gradient_frame(0), gradient_frame(1)];

    criterion.bench_function("hsv delta 640x360", |bencher| {
        let mut extractor = HsvDeltaExtractor::new();
        let mut next = 0;
        bencher.iter(|| {
            let row = extractor.extract(&frames[next]).unwrap();
            next ^= 1;
            row
        });
    });
}

fn benchmark_analysis_pass(criterion: &mut Criterion) {
    let frames: Vec<Frame> = (0..50).map(gradient_frame).collect();
    let mut group = criterion.benchmark_group("analysis pass 50 frames");
    group.sample_size(20);

    for (name, config) in [
        ("content", DetectorConfig::content_mode()),
        ("threshold", DetectorConfig::threshold_mode()),
    ] {
        let analyzer = SceneAnalyzer::new(config).unwrap();
        group.bench_function(name, |bencher| {
            bencher.iter(|| {
                let mut source = MemoryFrameSource::new(frames.clone(), 25.0);
                analyzer.analyze(&mut source).unwrap()
            });
        });
    }

    group.finish();
}

criterion::criterion_group!(
    benches,
    benchmark_intensity_sampling,
    benchmark_hsv_delta,
    benchmark_analysis_pass,
);
criterion::criterion_main!(benches);
