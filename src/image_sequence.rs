//! Frame source over a directory of still images.
//!
//! Files are ordered by name, so zero-padded sequences (`frame_0001.png`,
//! `frame_0002.png`, ...) play back in order. Each image is decoded lazily
//! with the `image` crate when its frame is pulled.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::error::{Result, SceneCutError};
use crate::frame::{Frame, FrameSource, SourceProperties};
use crate::timecode::FrameTimecode;

/// File extensions picked up from the directory, compared case-insensitively.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// A [`FrameSource`] reading one image per frame from a directory.
#[derive(Debug)]
pub struct ImageSequenceSource {
    directory: PathBuf,
    pending: VecDeque<PathBuf>,
    next_index: u64,
    properties: SourceProperties,
}

impl ImageSequenceSource {
    /// List the images in `directory` and play them at `frames_per_second`.
    ///
    /// Dimensions are read from the first image's header.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::NoFrames`] if the directory holds no
    /// supported images, an I/O error if it cannot be listed, or an image
    /// error if the first image's header is unreadable.
    pub fn open<P: AsRef<Path>>(directory: P, frames_per_second: f64) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&directory)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| SceneCutError::NoFrames(directory.clone()))?;
        let (width, height) = image::image_dimensions(first)?;

        log::debug!(
            "Image sequence {}: {} frames, {width}x{height}",
            directory.display(),
            paths.len()
        );

        let properties = SourceProperties {
            frame_count: paths.len() as u64,
            frames_per_second,
            width,
            height,
        };

        Ok(Self {
            directory,
            pending: paths.into(),
            next_index: 0,
            properties,
        })
    }

    /// The directory being read.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| extension.eq_ignore_ascii_case(candidate))
        })
}

impl Iterator for ImageSequenceSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.pending.pop_front()?;
        let index = self.next_index;
        self.next_index += 1;

        let timestamp = FrameTimecode::new(index, self.properties.frames_per_second).duration();
        let frame = image::open(&path)
            .map(|image| Frame::from_image(index, timestamp, image))
            .map_err(|error| SceneCutError::frame(index, format!("{}: {error}", path.display())));
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}

impl FrameSource for ImageSequenceSource {
    fn properties(&self) -> &SourceProperties {
        &self.properties
    }
}
