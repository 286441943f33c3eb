//! Video file decoding through FFmpeg.
//!
//! [`VideoFileSource`] opens a container with `ffmpeg-next`, decodes its
//! best video stream in presentation order and converts each frame to
//! tightly packed RGB24, optionally downscaled. Frames are numbered in the
//! order the decoder emits them, which keeps the index sequence gap-free
//! even for variable-frame-rate streams.
//!
//! Available with the `ffmpeg` feature.
//!
//! # Example
//!
//! ```no_run
//! use scenecut::{DetectorConfig, SceneAnalyzer, VideoFileSource};
//!
//! let mut source = VideoFileSource::open("input.mp4")?.with_downscale_width(320)?;
//! let report = SceneAnalyzer::new(DetectorConfig::content_mode())?.analyze(&mut source)?;
//! println!("{} scenes", report.scenes.len());
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::config::PixelFormat;
use crate::error::{Result, SceneCutError};
use crate::frame::{Frame, FrameSource, SourceProperties};
use crate::timecode::FrameTimecode;

/// A [`FrameSource`] decoding a video file.
pub struct VideoFileSource {
    path: PathBuf,
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    properties: SourceProperties,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    next_index: u64,
    eof_sent: bool,
    done: bool,
}

impl VideoFileSource {
    /// Open `path` and prepare to decode its best video stream at native
    /// resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::FfmpegError`] if the file cannot be opened,
    /// has no video stream, or its decoder cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| {
            SceneCutError::FfmpegError(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| {
            SceneCutError::FfmpegError(format!("{}: {error}", path.display()))
        })?;

        let stream = input.streams().best(Type::Video).ok_or_else(|| {
            SceneCutError::FfmpegError(format!("{}: no video stream", path.display()))
        })?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let frames_per_second = rational_to_f64(stream.avg_frame_rate())
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        // Prefer the container's frame count; estimate from duration otherwise.
        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else if input.duration() > 0 && frames_per_second > 0.0 {
            let duration = Duration::from_micros(input.duration() as u64);
            (duration.as_secs_f64() * frames_per_second).round() as u64
        } else {
            0
        };

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = rgb_scaler(&decoder, width, height)?;

        log::debug!(
            "Video stream {stream_index}: {width}x{height} at {frames_per_second:.3} fps, ~{frame_count} frames"
        );

        Ok(Self {
            path,
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            properties: SourceProperties {
                frame_count,
                frames_per_second,
                width,
                height,
            },
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            next_index: 0,
            eof_sent: false,
            done: false,
        })
    }

    /// Downscale decoded frames to `width` pixels, keeping the aspect ratio.
    ///
    /// Widths at or above the native width leave frames untouched. Smaller
    /// frames speed up metric extraction considerably.
    pub fn with_downscale_width(mut self, width: u32) -> Result<Self> {
        let (native_width, native_height) = (self.decoder.width(), self.decoder.height());
        if width == 0 || width >= native_width {
            return Ok(self);
        }

        let height = ((native_height as u64 * width as u64) / native_width as u64).max(1) as u32;
        self.scaler = rgb_scaler(&self.decoder, width, height)?;
        self.properties.width = width;
        self.properties.height = height;
        log::debug!("Downscaling {native_width}x{native_height} to {width}x{height}");
        Ok(self)
    }

    /// The file being decoded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn convert_current_frame(&mut self) -> Result<Frame> {
        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;

        let (width, height) = (self.properties.width, self.properties.height);
        let data = packed_rgb(&self.scaled_frame, width, height);
        let index = self.next_index;
        let timestamp = self
            .decoded_frame
            .pts()
            .map(|pts| pts_to_duration(pts, self.time_base))
            .unwrap_or_else(|| FrameTimecode::new(index, self.properties.frames_per_second).duration());

        self.next_index += 1;
        Ok(Frame::new(index, timestamp, width, height, PixelFormat::Rgb8, data))
    }
}

impl Iterator for VideoFileSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let frame = self.convert_current_frame();
                if frame.is_err() {
                    self.done = true;
                }
                return Some(frame);
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(SceneCutError::frame(
                                self.next_index,
                                format!("decoder rejected packet: {error}"),
                            )));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(SceneCutError::from(error)));
                    }
                    self.eof_sent = true;
                }
                // Transient read errors skip to the next packet.
                Err(_) => {}
            }
        }
    }
}

impl FrameSource for VideoFileSource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }
}

fn rgb_scaler(decoder: &VideoDecoder, width: u32, height: u32) -> Result<ScalingContext> {
    Ok(ScalingContext::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?)
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    (rate.denominator() != 0 && rate.numerator() > 0)
        .then(|| rate.numerator() as f64 / rate.denominator() as f64)
}

fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Copy an RGB24 plane into a buffer without row padding.
fn packed_rgb(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    }
}
