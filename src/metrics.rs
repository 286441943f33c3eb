//! Per-frame metric extraction.
//!
//! [`MetricExtractor`] turns each decoded [`Frame`] into a [`MetricRow`]:
//!
//! - **Threshold mode** samples pixel intensity on a `block_size` grid and
//!   reports the average intensity and the fraction of sampled pixels at or
//!   below the intensity threshold.
//! - **Content mode** converts the frame to 8-bit HSV and reports the mean
//!   absolute per-channel difference against the previous frame.
//!
//! Rows are what the detectors consume and what the stats file stores, so a
//! recorded pass can be re-scored without decoding again.

use std::time::Duration;

use crate::config::{DetectionMode, DetectorConfig, PixelFormat};
use crate::error::{Result, SceneCutError};
use crate::frame::Frame;

/// Metric keys produced in threshold mode, in column order.
pub const THRESHOLD_METRIC_KEYS: &[&str] = &["avg_intensity", "dark_fraction"];

/// Metric keys produced in content mode, in column order.
pub const CONTENT_METRIC_KEYS: &[&str] = &["content_val", "delta_hue", "delta_sat", "delta_lum"];

/// The metric keys a detector mode reads and records.
pub fn metric_keys(mode: DetectionMode) -> &'static [&'static str] {
    match mode {
        DetectionMode::Threshold => THRESHOLD_METRIC_KEYS,
        DetectionMode::Content => CONTENT_METRIC_KEYS,
    }
}

/// Metric values for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    frame: u64,
    timestamp: Duration,
    keys: &'static [&'static str],
    values: Vec<f64>,
}

impl MetricRow {
    /// Create a row. `values` are positional and must match `keys`.
    pub fn new(
        frame: u64,
        timestamp: Duration,
        keys: &'static [&'static str],
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            frame,
            timestamp,
            keys,
            values,
        }
    }

    /// A threshold-mode row.
    pub fn threshold(frame: u64, timestamp: Duration, avg_intensity: f64, dark_fraction: f64) -> Self {
        Self::new(
            frame,
            timestamp,
            THRESHOLD_METRIC_KEYS,
            vec![avg_intensity, dark_fraction],
        )
    }

    /// A content-mode row with the per-channel deltas.
    pub fn content(frame: u64, timestamp: Duration, delta_hue: f64, delta_sat: f64, delta_lum: f64) -> Self {
        let content_val = (delta_hue + delta_sat + delta_lum) / 3.0;
        Self::new(
            frame,
            timestamp,
            CONTENT_METRIC_KEYS,
            vec![content_val, delta_hue, delta_sat, delta_lum],
        )
    }

    /// Frame index.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Presentation timestamp of the frame.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Metric names, in column order.
    pub fn keys(&self) -> &'static [&'static str] {
        self.keys
    }

    /// Metric values, in column order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Look a metric up by name.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.keys
            .iter()
            .position(|candidate| *candidate == key)
            .map(|index| self.values[index])
    }
}

/// Frame-to-row conversion for the active detector mode.
#[derive(Debug, Clone)]
pub enum MetricExtractor {
    /// Threshold mode.
    Intensity(IntensitySampler),
    /// Content mode.
    HsvDelta(HsvDeltaExtractor),
}

impl MetricExtractor {
    /// Build the extractor matching `config.mode`.
    pub fn new(config: &DetectorConfig) -> Self {
        match config.mode {
            DetectionMode::Threshold => MetricExtractor::Intensity(IntensitySampler::new(
                config.block_size,
                config.threshold,
            )),
            DetectionMode::Content => MetricExtractor::HsvDelta(HsvDeltaExtractor::new()),
        }
    }

    /// Metric keys of the rows this extractor produces.
    pub fn metric_keys(&self) -> &'static [&'static str] {
        match self {
            MetricExtractor::Intensity(_) => THRESHOLD_METRIC_KEYS,
            MetricExtractor::HsvDelta(_) => CONTENT_METRIC_KEYS,
        }
    }

    /// Compute the row for `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::FrameDecode`] for malformed buffers or a
    /// mid-stream change of frame size.
    pub fn extract(&mut self, frame: &Frame) -> Result<MetricRow> {
        match self {
            MetricExtractor::Intensity(sampler) => sampler.extract(frame),
            MetricExtractor::HsvDelta(extractor) => extractor.extract(frame),
        }
    }

    /// Remember `frame` as the lookback frame without producing a row.
    ///
    /// Used when replayed stats run out and fresh extraction resumes at the
    /// next frame.
    pub fn prime(&mut self, frame: &Frame) -> Result<()> {
        match self {
            MetricExtractor::Intensity(_) => frame.validate(),
            MetricExtractor::HsvDelta(extractor) => extractor.prime(frame),
        }
    }
}

/// Strided intensity sampling for the threshold detector.
#[derive(Debug, Clone)]
pub struct IntensitySampler {
    block_size: u32,
    threshold: f64,
}

impl IntensitySampler {
    /// Sample every `block_size`-th pixel in both axes; pixels at or below
    /// `threshold` count as dark.
    pub fn new(block_size: u32, threshold: f64) -> Self {
        Self {
            block_size: block_size.max(1),
            threshold,
        }
    }

    /// Compute `avg_intensity` and `dark_fraction` for `frame`.
    pub fn extract(&self, frame: &Frame) -> Result<MetricRow> {
        frame.validate()?;

        let step = self.block_size as usize;
        let mut sampled: u64 = 0;
        let mut dark: u64 = 0;
        let mut intensity_sum = 0.0;

        for y in (0..frame.height()).step_by(step) {
            for x in (0..frame.width()).step_by(step) {
                let intensity = pixel_intensity(frame.pixel(x, y), frame.format());
                intensity_sum += intensity;
                if intensity <= self.threshold {
                    dark += 1;
                }
                sampled += 1;
            }
        }

        // validate() guarantees at least the pixel at (0, 0).
        let sampled = sampled as f64;
        Ok(MetricRow::threshold(
            frame.index(),
            frame.timestamp(),
            intensity_sum / sampled,
            dark as f64 / sampled,
        ))
    }
}

/// Mean of the colour channels of one pixel; alpha is ignored.
fn pixel_intensity(pixel: &[u8], format: PixelFormat) -> f64 {
    match format {
        PixelFormat::Gray8 => pixel[0] as f64,
        PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
            (pixel[0] as f64 + pixel[1] as f64 + pixel[2] as f64) / 3.0
        }
    }
}

/// HSV planes of the previous frame.
#[derive(Debug, Clone)]
struct HsvPlanes {
    width: u32,
    height: u32,
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl HsvPlanes {
    fn from_frame(frame: &Frame) -> Self {
        let count = frame.pixel_count();
        let mut hue = Vec::with_capacity(count);
        let mut saturation = Vec::with_capacity(count);
        let mut value = Vec::with_capacity(count);

        let channels = frame.format().channels();
        for pixel in frame.data().chunks_exact(channels) {
            let [h, s, v] = match frame.format() {
                PixelFormat::Gray8 => [0, 0, pixel[0]],
                PixelFormat::Rgb8 | PixelFormat::Rgba8 => rgb_to_hsv(pixel[0], pixel[1], pixel[2]),
            };
            hue.push(h);
            saturation.push(s);
            value.push(v);
        }

        Self {
            width: frame.width(),
            height: frame.height(),
            hue,
            saturation,
            value,
        }
    }
}

/// HSV difference against the previous frame for the content detector.
#[derive(Debug, Clone, Default)]
pub struct HsvDeltaExtractor {
    previous: Option<HsvPlanes>,
}

impl HsvDeltaExtractor {
    /// Create an extractor with no lookback frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the content row for `frame` and keep it as the next lookback.
    ///
    /// The first frame has no predecessor and yields a row of zeros.
    pub fn extract(&mut self, frame: &Frame) -> Result<MetricRow> {
        frame.validate()?;
        let current = HsvPlanes::from_frame(frame);

        let row = match &self.previous {
            Some(previous) => {
                if previous.width != current.width || previous.height != current.height {
                    return Err(SceneCutError::frame(
                        frame.index(),
                        format!(
                            "frame size changed from {}x{} to {}x{}",
                            previous.width, previous.height, current.width, current.height
                        ),
                    ));
                }
                MetricRow::content(
                    frame.index(),
                    frame.timestamp(),
                    mean_abs_delta(&previous.hue, &current.hue),
                    mean_abs_delta(&previous.saturation, &current.saturation),
                    mean_abs_delta(&previous.value, &current.value),
                )
            }
            None => MetricRow::content(frame.index(), frame.timestamp(), 0.0, 0.0, 0.0),
        };

        self.previous = Some(current);
        Ok(row)
    }

    /// Keep `frame` as the lookback frame.
    pub fn prime(&mut self, frame: &Frame) -> Result<()> {
        frame.validate()?;
        self.previous = Some(HsvPlanes::from_frame(frame));
        Ok(())
    }
}

fn mean_abs_delta(previous: &[u8], current: &[u8]) -> f64 {
    let total: u64 = previous
        .iter()
        .zip(current)
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();
    total as f64 / current.len() as f64
}

/// Convert an 8-bit RGB pixel to 8-bit HSV.
///
/// Hue is halved into `0..180` so it fits a byte; saturation and value span
/// `0..=255`.
pub fn rgb_to_hsv(red: u8, green: u8, blue: u8) -> [u8; 3] {
    let (r, g, b) = (red as f64, green as f64, blue as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 {
        (255.0 * delta / max).round()
    } else {
        0.0
    };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    let hue = (hue / 2.0).round() as u32 % 180;

    [hue as u8, saturation as u8, max as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(index: u64, rgb: [u8; 3], width: u32, height: u32) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Frame::new(index, Duration::ZERO, width, height, PixelFormat::Rgb8, data)
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 255, 0), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 255), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(0, 0, 0), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(128, 128, 128), [0, 0, 128]);
    }

    #[test]
    fn intensity_sampling_respects_stride() {
        // 4x1 gray frame: only x = 0 and x = 2 are sampled with stride 2.
        let frame = Frame::new(0, Duration::ZERO, 4, 1, PixelFormat::Gray8, vec![0, 255, 10, 255]);
        let row = IntensitySampler::new(2, 12.0).extract(&frame).unwrap();
        assert_eq!(row.get("avg_intensity"), Some(5.0));
        assert_eq!(row.get("dark_fraction"), Some(1.0));
    }

    #[test]
    fn first_content_row_is_a_zero_sentinel() {
        let mut extractor = HsvDeltaExtractor::new();
        let row = extractor.extract(&solid(0, [255, 255, 255], 2, 2)).unwrap();
        assert_eq!(row.values(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn black_to_white_is_a_full_value_swing() {
        let mut extractor = HsvDeltaExtractor::new();
        extractor.extract(&solid(0, [0, 0, 0], 2, 2)).unwrap();
        let row = extractor.extract(&solid(1, [255, 255, 255], 2, 2)).unwrap();
        assert_eq!(row.get("delta_lum"), Some(255.0));
        assert_eq!(row.get("delta_hue"), Some(0.0));
        assert_eq!(row.get("content_val"), Some(85.0));
    }

    #[test]
    fn size_change_is_a_decode_error() {
        let mut extractor = HsvDeltaExtractor::new();
        extractor.extract(&solid(0, [0, 0, 0], 2, 2)).unwrap();
        let error = extractor.extract(&solid(1, [0, 0, 0], 4, 4)).unwrap_err();
        assert!(matches!(error, SceneCutError::FrameDecode { frame_index: 1, .. }));
    }
}
