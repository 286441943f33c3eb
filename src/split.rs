//! Splitting a video into one file per scene.
//!
//! [`VideoSplitter`] drives an external tool over a [`SceneList`]: `ffmpeg`
//! once per scene (stream copy or re-encode), or `mkvmerge` once for the
//! whole list. The tool must be installed and on `PATH`.
//!
//! # Example
//!
//! ```no_run
//! use scenecut::{SplitMode, VideoSplitter};
//! # fn scenes() -> scenecut::SceneList { unimplemented!() }
//!
//! let scenes = scenes();
//! let outputs = VideoSplitter::new("input.mp4", "clips")
//!     .with_mode(SplitMode::Reencode)
//!     .run(&scenes)?;
//! println!("wrote {} clips", outputs.len());
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::assembler::SceneList;
use crate::error::{Result, SceneCutError};
use crate::progress::{
    CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker,
};

/// How clips are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// `ffmpeg -c copy`. Fast, but cuts snap to the nearest keyframe.
    #[default]
    StreamCopy,
    /// `ffmpeg` re-encoding with libx264/AAC. Frame-accurate.
    Reencode,
    /// `mkvmerge --split timecodes:`. Always writes Matroska.
    Mkvmerge,
}

impl SplitMode {
    /// Binary the mode runs.
    pub fn tool(self) -> &'static str {
        match self {
            SplitMode::StreamCopy | SplitMode::Reencode => "ffmpeg",
            SplitMode::Mkvmerge => "mkvmerge",
        }
    }
}

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCommand {
    /// Binary name.
    pub program: &'static str,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Files the invocation is expected to write.
    pub outputs: Vec<PathBuf>,
}

impl SplitCommand {
    fn to_command(&self) -> Command {
        let mut command = Command::new(self.program);
        command.args(&self.args);
        command
    }
}

/// Writes one clip per scene with an external tool.
pub struct VideoSplitter {
    input: PathBuf,
    output_dir: PathBuf,
    mode: SplitMode,
    name: Option<String>,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl Debug for VideoSplitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSplitter")
            .field("input", &self.input)
            .field("output_dir", &self.output_dir)
            .field("mode", &self.mode)
            .field("name", &self.name)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl VideoSplitter {
    /// Split `input` into clips written under `output_dir`.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(input: P1, output_dir: P2) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            mode: SplitMode::default(),
            name: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Choose the tool and encoding.
    #[must_use]
    pub fn with_mode(mut self, mode: SplitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Base name of the clips. Defaults to the input's file stem.
    #[must_use]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Report one progress step per finished invocation.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop between invocations once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn base_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string())
        })
    }

    fn extension(&self) -> String {
        match self.mode {
            SplitMode::Mkvmerge => "mkv".to_string(),
            SplitMode::StreamCopy | SplitMode::Reencode => self
                .input
                .extension()
                .map(|extension| extension.to_string_lossy().into_owned())
                .unwrap_or_else(|| "mp4".to_string()),
        }
    }

    fn clip_path(&self, number: usize) -> PathBuf {
        self.output_dir.join(format!(
            "{}-Scene-{number:03}.{}",
            self.base_name(),
            self.extension()
        ))
    }

    /// The invocations [`run`](VideoSplitter::run) would execute.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::SplitTool`] for an empty scene list.
    pub fn commands(&self, scenes: &SceneList) -> Result<Vec<SplitCommand>> {
        if scenes.is_empty() {
            return Err(SceneCutError::SplitTool {
                tool: self.mode.tool().to_string(),
                reason: "scene list is empty".to_string(),
            });
        }

        let input = self.input.to_string_lossy().into_owned();
        match self.mode {
            SplitMode::StreamCopy | SplitMode::Reencode => Ok(scenes
                .iter()
                .map(|scene| {
                    let output = self.clip_path(scene.number);
                    let mut args: Vec<String> = [
                        "-nostdin",
                        "-y",
                        "-v",
                        "error",
                        "-ss",
                    ]
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect();
                    args.push(scene.start.to_string());
                    args.extend(["-i".to_string(), input.clone()]);
                    args.extend([
                        "-t".to_string(),
                        format!("{:.3}", scene.duration().as_secs_f64()),
                        "-map".to_string(),
                        "0".to_string(),
                    ]);
                    let codec_args: &[&str] = match self.mode {
                        SplitMode::Reencode => &[
                            "-c:v", "libx264", "-preset", "fast", "-crf", "21", "-c:a", "aac",
                        ],
                        _ => &["-c", "copy"],
                    };
                    args.extend(codec_args.iter().map(|arg| arg.to_string()));
                    args.push(output.to_string_lossy().into_owned());

                    SplitCommand {
                        program: "ffmpeg",
                        args,
                        outputs: vec![output],
                    }
                })
                .collect()),
            SplitMode::Mkvmerge => {
                let outputs: Vec<PathBuf> = scenes.iter().map(|scene| self.clip_path(scene.number)).collect();
                let mut args = vec!["-q".to_string(), "-o".to_string()];
                if scenes.len() == 1 {
                    args.push(outputs[0].to_string_lossy().into_owned());
                } else {
                    // mkvmerge appends `-001`, `-002`, ... to the output name.
                    let pattern = self
                        .output_dir
                        .join(format!("{}-Scene.mkv", self.base_name()));
                    args.push(pattern.to_string_lossy().into_owned());
                    let timecodes: Vec<String> = scenes
                        .iter()
                        .skip(1)
                        .map(|scene| scene.start.to_string())
                        .collect();
                    args.push("--split".to_string());
                    args.push(format!("timecodes:{}", timecodes.join(",")));
                }
                args.push(input);
                Ok(vec![SplitCommand {
                    program: "mkvmerge",
                    args,
                    outputs,
                }])
            }
        }
    }

    /// Create the output directory and run every invocation in order.
    ///
    /// Returns the clip paths written.
    ///
    /// # Errors
    ///
    /// Returns [`SceneCutError::SplitTool`] if the tool is missing or exits
    /// with a failure, and [`SceneCutError::Cancelled`] if the token fires
    /// between invocations.
    pub fn run(&self, scenes: &SceneList) -> Result<Vec<PathBuf>> {
        let commands = self.commands(scenes)?;
        std::fs::create_dir_all(&self.output_dir)?;

        log::debug!(
            "Splitting {} into {} clips with {}",
            self.input.display(),
            scenes.len(),
            self.mode.tool()
        );

        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::Splitting,
            Some(commands.len() as u64),
            1,
        );

        let mut written = Vec::new();
        for (position, command) in commands.into_iter().enumerate() {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return Err(SceneCutError::Cancelled);
            }

            log::debug!("Running {} {}", command.program, command.args.join(" "));
            execute(&command)?;
            written.extend(command.outputs);
            tracker.advance(Some(position as u64), scenes.len());
        }
        tracker.finish(scenes.len());

        log::info!("Wrote {} clips to {}", written.len(), self.output_dir.display());
        Ok(written)
    }
}

fn execute(command: &SplitCommand) -> Result<()> {
    let output = command.to_command().output().map_err(|error| SceneCutError::SplitTool {
        tool: command.program.to_string(),
        reason: if error.kind() == ErrorKind::NotFound {
            format!("`{}` was not found on PATH", command.program)
        } else {
            format!("could not be started: {error}")
        },
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().last().unwrap_or("no diagnostic output");
        return Err(SceneCutError::SplitTool {
            tool: command.program.to_string(),
            reason: format!("exited with {}: {detail}", output.status),
        });
    }
    Ok(())
}
