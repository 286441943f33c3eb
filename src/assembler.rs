//! Scene list assembly.
//!
//! [`SceneAssembler`] turns the ordered boundary stream of a detector into a
//! gapless [`SceneList`] covering `[0, total_frames)`. The list is checked for
//! contiguity before it is returned; a violation means a detector emitted
//! boundaries out of order and is reported as
//! [`SceneCutError::AssemblyInvariantViolation`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use csv::{Terminator, WriterBuilder};
use serde_json::{Value, json};

use crate::detector::SceneBoundary;
use crate::error::{Result, SceneCutError};
use crate::timecode::FrameTimecode;

/// Column header of the scene list file.
pub const SCENE_LIST_HEADER: &str = "Scene Number,Start Frame,Start Timecode,End Frame,End Timecode,Length (frames),Length (seconds)";

/// One scene: a half-open frame range with its timecodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// 1-based position in the scene list.
    pub number: usize,
    /// First frame (inclusive).
    pub start: FrameTimecode,
    /// One past the last frame (exclusive).
    pub end: FrameTimecode,
}

impl Scene {
    /// First frame (inclusive).
    pub fn start_frame(&self) -> u64 {
        self.start.frame()
    }

    /// End frame (exclusive).
    pub fn end_frame(&self) -> u64 {
        self.end.frame()
    }

    /// Number of frames in the scene.
    pub fn len_frames(&self) -> u64 {
        self.end_frame() - self.start_frame()
    }

    /// Playback length of the scene.
    pub fn duration(&self) -> Duration {
        self.end.duration().saturating_sub(self.start.duration())
    }
}

/// An ordered, contiguous list of scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneList {
    scenes: Vec<Scene>,
    frames_per_second: f64,
    total_frames: u64,
}

impl SceneList {
    /// Number of scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// `true` for a zero-frame stream.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// The scenes in order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Iterate over the scenes.
    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    /// Frame rate of every timecode in the list.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Number of frames covered.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `(start, end)` frame pairs.
    pub fn frame_ranges(&self) -> Vec<(u64, u64)> {
        self.scenes
            .iter()
            .map(|scene| (scene.start_frame(), scene.end_frame()))
            .collect()
    }

    /// Start frames of every scene but the first.
    pub fn cut_frames(&self) -> Vec<u64> {
        self.scenes.iter().skip(1).map(Scene::start_frame).collect()
    }

    /// Write the list as delimited text: a header row, then one row per
    /// scene.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        writer.write_record(SCENE_LIST_HEADER.split(','))?;
        for scene in &self.scenes {
            writer.write_record([
                scene.number.to_string(),
                scene.start_frame().to_string(),
                scene.start.to_string(),
                scene.end_frame().to_string(),
                scene.end.to_string(),
                scene.len_frames().to_string(),
                format!("{:.3}", scene.duration().as_secs_f64()),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the list to `path`, replacing any existing file.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))
    }

    /// Machine-readable form for JSON output.
    pub fn to_json(&self) -> Value {
        json!({
            "frames_per_second": self.frames_per_second,
            "total_frames": self.total_frames,
            "scenes": self.scenes.iter().map(|scene| json!({
                "number": scene.number,
                "start_frame": scene.start_frame(),
                "end_frame": scene.end_frame(),
                "start_timecode": scene.start.to_string(),
                "end_timecode": scene.end.to_string(),
                "length_frames": scene.len_frames(),
                "length_seconds": scene.duration().as_secs_f64(),
            })).collect::<Vec<_>>(),
        })
    }
}

impl<'a> IntoIterator for &'a SceneList {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}

/// Accumulates boundaries into closed frame ranges.
#[derive(Debug, Clone, Default)]
pub struct SceneAssembler {
    current_start: u64,
    ranges: Vec<(u64, u64)>,
}

impl SceneAssembler {
    /// Start assembling at frame 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the open scene at `boundary.frame`.
    ///
    /// A boundary at the open scene's own start frame (the fade-in paired
    /// with a fade-out, or a cut at frame 0) closes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::AssemblyInvariantViolation`] if the boundary
    /// lies before the open scene's start.
    pub fn push(&mut self, boundary: SceneBoundary) -> Result<()> {
        if boundary.frame < self.current_start {
            return Err(SceneCutError::AssemblyInvariantViolation(format!(
                "{} boundary at frame {} precedes the open scene starting at frame {}",
                boundary.kind, boundary.frame, self.current_start
            )));
        }
        if boundary.frame > self.current_start {
            self.ranges.push((self.current_start, boundary.frame));
            self.current_start = boundary.frame;
        }
        Ok(())
    }

    /// Scenes closed so far.
    pub fn closed_scenes(&self) -> usize {
        self.ranges.len()
    }

    /// Close the final scene at `total_frames` and verify the list.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::AssemblyInvariantViolation`] when a boundary
    /// lies at or past the end of the stream or the ranges are not
    /// contiguous.
    pub fn finish(mut self, total_frames: u64, frames_per_second: f64) -> Result<SceneList> {
        if total_frames == 0 {
            if !self.ranges.is_empty() {
                return Err(SceneCutError::AssemblyInvariantViolation(
                    "boundaries reported for an empty stream".to_string(),
                ));
            }
            return Ok(SceneList {
                scenes: Vec::new(),
                frames_per_second,
                total_frames,
            });
        }

        if self.current_start >= total_frames {
            return Err(SceneCutError::AssemblyInvariantViolation(format!(
                "boundary at frame {} is not inside a stream of {total_frames} frames",
                self.current_start
            )));
        }
        self.ranges.push((self.current_start, total_frames));

        verify_ranges(&self.ranges, total_frames)?;

        let scenes = self
            .ranges
            .iter()
            .enumerate()
            .map(|(position, &(start, end))| Scene {
                number: position + 1,
                start: FrameTimecode::new(start, frames_per_second),
                end: FrameTimecode::new(end, frames_per_second),
            })
            .collect();

        Ok(SceneList {
            scenes,
            frames_per_second,
            total_frames,
        })
    }
}

fn verify_ranges(ranges: &[(u64, u64)], total_frames: u64) -> Result<()> {
    let mut expected_start = 0;
    for &(start, end) in ranges {
        if start != expected_start {
            return Err(SceneCutError::AssemblyInvariantViolation(format!(
                "scene starts at frame {start}, expected {expected_start}"
            )));
        }
        if end <= start {
            return Err(SceneCutError::AssemblyInvariantViolation(format!(
                "empty or inverted scene [{start}, {end})"
            )));
        }
        expected_start = end;
    }
    if expected_start != total_frames {
        return Err(SceneCutError::AssemblyInvariantViolation(format!(
            "scenes end at frame {expected_start}, stream has {total_frames} frames"
        )));
    }
    Ok(())
}
