//! Decoded frames and the frame source contract.
//!
//! The engine never decodes video itself. Anything that yields [`Frame`]s in
//! increasing index order and knows its frame count and frame rate up front
//! can drive an analysis by implementing [`FrameSource`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use scenecut::{Frame, FrameSource, MemoryFrameSource, PixelFormat};
//!
//! let frames = (0..3)
//!     .map(|index| {
//!         Frame::new(
//!             index,
//!             Duration::from_millis(index * 40),
//!             2,
//!             2,
//!             PixelFormat::Gray8,
//!             vec![128; 4],
//!         )
//!     })
//!     .collect();
//!
//! let source = MemoryFrameSource::new(frames, 25.0);
//! assert_eq!(source.properties().frame_count, 3);
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use image::DynamicImage;

use crate::config::PixelFormat;
use crate::error::{Result, SceneCutError};

/// One decoded frame.
///
/// Owned by the frame source for one iteration; the analyzer drops it once
/// its metrics are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: u64,
    timestamp: Duration,
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a tightly packed pixel buffer.
    ///
    /// The buffer is not checked here; [`validate`](Frame::validate) is run
    /// by the metric extractor before any pixel is read.
    pub fn new(
        index: u64,
        timestamp: Duration,
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            index,
            timestamp,
            width,
            height,
            format,
            data,
        }
    }

    /// Build a frame from an [`image::DynamicImage`].
    ///
    /// Grayscale and RGBA images keep their layout; everything else is
    /// converted to 8-bit RGB.
    pub fn from_image(index: u64, timestamp: Duration, image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image {
            DynamicImage::ImageLuma8(buffer) => (PixelFormat::Gray8, buffer.into_raw()),
            DynamicImage::ImageRgba8(buffer) => (PixelFormat::Rgba8, buffer.into_raw()),
            DynamicImage::ImageRgb8(buffer) => (PixelFormat::Rgb8, buffer.into_raw()),
            other => (PixelFormat::Rgb8, other.to_rgb8().into_raw()),
        };
        Self::new(index, timestamp, width, height, format, data)
    }

    /// Frame index, starting at 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Presentation timestamp.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of [`data`](Frame::data).
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major, no padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The bytes of the pixel at (`x`, `y`).
    pub(crate) fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let channels = self.format.channels();
        let offset = (y as usize * self.width as usize + x as usize) * channels;
        &self.data[offset..offset + channels]
    }

    /// Reject zero-sized frames and buffers whose length does not match the
    /// declared dimensions and channel count.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::FrameDecode`] describing the defect.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneCutError::frame(
                self.index,
                format!("zero-size frame ({}x{})", self.width, self.height),
            ));
        }
        let expected = self.pixel_count() * self.format.channels();
        if self.data.len() != expected {
            return Err(SceneCutError::frame(
                self.index,
                format!(
                    "buffer holds {} bytes, {}x{} {:?} needs {expected}",
                    self.data.len(),
                    self.width,
                    self.height,
                    self.format,
                ),
            ));
        }
        Ok(())
    }
}

/// What a frame source knows before the first frame is pulled.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProperties {
    /// Total number of frames the source expects to yield.
    ///
    /// Container-derived counts may be estimates; the scene list always
    /// ends at the number of frames actually processed.
    pub frame_count: u64,
    /// Frames per second.
    pub frames_per_second: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl SourceProperties {
    /// Check that the frame rate is usable for timecodes.
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.frames_per_second.is_finite() || self.frames_per_second <= 0.0 {
            return Err(SceneCutError::config(
                "frames_per_second",
                format!("must be positive, got {}", self.frames_per_second),
            ));
        }
        Ok(())
    }
}

/// A lazy, finite, non-restartable sequence of frames.
///
/// Frames must be yielded in strictly increasing index order starting at 0.
/// Parallel decoders must re-sequence before handing frames to the analyzer.
pub trait FrameSource: Iterator<Item = Result<Frame>> {
    /// Frame count, frame rate and dimensions, known up front.
    fn properties(&self) -> &SourceProperties;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn properties(&self) -> &SourceProperties {
        (**self).properties()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn properties(&self) -> &SourceProperties {
        (**self).properties()
    }
}

/// A frame source over frames already held in memory.
///
/// Useful for tests and for callers that decode with their own pipeline.
#[derive(Debug, Clone)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
    properties: SourceProperties,
}

impl MemoryFrameSource {
    /// Create a source yielding `frames` in order at `frames_per_second`.
    ///
    /// Dimensions are taken from the first frame.
    pub fn new(frames: Vec<Frame>, frames_per_second: f64) -> Self {
        let (width, height) = frames
            .first()
            .map(|frame| (frame.width(), frame.height()))
            .unwrap_or((0, 0));
        let properties = SourceProperties {
            frame_count: frames.len() as u64,
            frames_per_second,
            width,
            height,
        };
        Self {
            frames: frames.into(),
            properties,
        }
    }

    /// Override the advertised frame count.
    ///
    /// Mirrors containers whose header count disagrees with the decoded
    /// stream.
    #[must_use]
    pub fn with_frame_count(mut self, frame_count: u64) -> Self {
        self.properties.frame_count = frame_count;
        self
    }
}

impl Iterator for MemoryFrameSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.frames.pop_front().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.frames.len(), Some(self.frames.len()))
    }
}

impl FrameSource for MemoryFrameSource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }
}
