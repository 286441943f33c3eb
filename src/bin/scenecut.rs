use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use scenecut::{
    AnalysisOptions, AnalysisReport, DetectionMode, DetectorConfig, FrameSource, FrameTimecode,
    ImageSequenceSource, PrefetchSource, ProgressCallback, ProgressInfo, SceneAnalyzer, SplitMode,
    StatsFile, VideoSplitter,
};

const CLI_AFTER_HELP: &str = "Examples:\n  scenecut detect input.mp4 --stats input.stats.csv --output scenes.csv\n  scenecut detect input.mp4 --mode threshold --threshold 16 --fade-bias 0.5 --json\n  scenecut detect frames/ --fps 24 --min-scene-len 00:00:01.5\n  scenecut replay input.stats.csv --threshold 40\n  scenecut completions zsh > _scenecut";

#[derive(Debug, Parser)]
#[command(
    name = "scenecut",
    version,
    about = "Detect scene cuts and fades in videos and image sequences",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,
}

#[derive(Debug, Args, Clone)]
struct DetectorArgs {
    /// Detector: content (cuts) or threshold (fades).
    #[arg(long, default_value = "content")]
    mode: String,

    /// Detection threshold. Defaults to 30 (content) or 12 (threshold).
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum scene length, in frames or as a timecode (e.g. 0.6s, 00:00:01.5).
    #[arg(long, default_value = "15")]
    min_scene_len: String,

    /// Threshold mode: percentage of pixels that must be dark.
    #[arg(long, default_value_t = 95.0)]
    min_percent: f64,

    /// Threshold mode: pixel sampling stride.
    #[arg(long, default_value_t = 8)]
    block_size: u32,

    /// Threshold mode: split position inside a fade, from -1 (fade-out) to 1 (fade-in).
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    fade_bias: f64,
}

#[derive(Debug, Args, Clone)]
struct OutputArgs {
    /// Write the scene list as CSV to this path.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print the result as machine-readable JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect scenes in a video file or image directory.
    #[command(
        about = "Detect scenes",
        visible_alias = "detect-scenes",
        after_help = "Examples:\n  scenecut detect input.mp4 --stats input.stats.csv\n  scenecut detect input.mp4 --split clips --split-mode reencode"
    )]
    Detect {
        /// Video file, or a directory of images played in name order.
        input: PathBuf,

        #[command(flatten)]
        detector: DetectorArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Frame rate of an image directory.
        #[arg(long, default_value_t = 24.0)]
        fps: f64,

        /// Downscale video frames to this width before analysis.
        #[arg(long)]
        downscale: Option<u32>,

        /// Stats file to replay from and record to.
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Replay the stats file but do not rewrite it.
        #[arg(long)]
        no_record: bool,

        /// Decode ahead on a background thread, holding up to N frames.
        #[arg(long)]
        prefetch: Option<usize>,

        /// Write one clip per scene into this directory.
        #[arg(long)]
        split: Option<PathBuf>,

        /// Clip writer: copy, reencode or mkvmerge.
        #[arg(long, default_value = "copy")]
        split_mode: String,
    },

    /// Re-score a stats file with new detector settings, without decoding.
    #[command(
        about = "Detect scenes from a stats file",
        after_help = "Examples:\n  scenecut replay input.stats.csv --threshold 40 --min-scene-len 1s"
    )]
    Replay {
        /// Stats file recorded by `detect --stats`.
        stats: PathBuf,

        #[command(flatten)]
        detector: DetectorArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_split_mode(value: &str) -> Option<SplitMode> {
    match value.to_ascii_lowercase().as_str() {
        "copy" | "stream-copy" => Some(SplitMode::StreamCopy),
        "reencode" | "encode" => Some(SplitMode::Reencode),
        "mkvmerge" | "mkv" => Some(SplitMode::Mkvmerge),
        _ => None,
    }
}

fn build_config(
    args: &DetectorArgs,
    frames_per_second: f64,
) -> Result<DetectorConfig, Box<dyn std::error::Error>> {
    let mode: DetectionMode = args.mode.parse()?;
    let min_scene_len = FrameTimecode::parse(&args.min_scene_len, frames_per_second)?.frame();

    let mut config = DetectorConfig::new(mode)
        .with_min_scene_len(min_scene_len)
        .with_min_percent(args.min_percent)
        .with_block_size(args.block_size)
        .with_fade_bias(args.fade_bias);
    if let Some(threshold) = args.threshold {
        config = config.with_threshold(threshold);
    }
    config.validate()?;
    Ok(config)
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

#[cfg(feature = "ffmpeg")]
fn open_video(
    path: &Path,
    downscale: Option<u32>,
    prefetch: Option<usize>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use scenecut::VideoFileSource;

    let open = {
        let path = path.to_path_buf();
        move || {
            let source = VideoFileSource::open(&path)?;
            match downscale {
                Some(width) => source.with_downscale_width(width),
                None => Ok(source),
            }
        }
    };

    match prefetch {
        Some(capacity) => Ok(Box::new(PrefetchSource::spawn(open, capacity)?)),
        None => Ok(Box::new(open()?)),
    }
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video(
    path: &Path,
    _downscale: Option<u32>,
    _prefetch: Option<usize>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err(format!(
        "{}: decoding video files requires building with the `ffmpeg` feature",
        path.display()
    )
    .into())
}

fn open_source(
    input: &Path,
    fps: f64,
    downscale: Option<u32>,
    prefetch: Option<usize>,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if !input.is_dir() {
        return open_video(input, downscale, prefetch);
    }

    if downscale.is_some() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "--downscale only applies to video files".yellow()
        );
    }
    let source = ImageSequenceSource::open(input, fps)?;
    match prefetch {
        Some(capacity) => Ok(Box::new(PrefetchSource::new(source, capacity)?)),
        None => Ok(Box::new(source)),
    }
}

/// Progress bar fed by analysis callbacks.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
        self.bar
            .set_message(format!("{} scene(s)", info.scenes_detected));
    }
}

fn print_report(
    report: &AnalysisReport,
    output: &OutputArgs,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &output.output {
        ensure_writable_path(path, overwrite)?;
        report.scenes.save_csv(path)?;
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(());
    }

    if report.cancelled {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "analysis cancelled, scene list is partial".yellow()
        );
    }
    for scene in &report.scenes {
        println!(
            "Scene {:>3}: {} - {}  (frames {}-{}, {} frames)",
            scene.number,
            scene.start,
            scene.end,
            scene.start_frame(),
            scene.end_frame(),
            scene.len_frames()
        );
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Detected {} scene(s) in {} frame(s)",
            report.scenes.len(),
            report.frames_processed
        )
        .green()
    );
    if let Some(path) = &output.output {
        println!("{} {}", "saved".green().bold(), path.display());
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Detect {
            input,
            detector,
            output,
            fps,
            downscale,
            stats,
            no_record,
            prefetch,
            split,
            split_mode,
        } => {
            let split_mode = parse_split_mode(&split_mode)
                .ok_or(format!("unsupported --split-mode: {split_mode}"))?;
            if prefetch == Some(0) {
                return Err("--prefetch must be greater than 0".into());
            }

            let mut source = open_source(&input, fps, downscale, prefetch)?;
            let properties = source.properties().clone();
            let config = build_config(&detector, properties.frames_per_second)?;

            let mut options = AnalysisOptions::new().with_stats_recording(!no_record);
            if let Some(stats) = &stats {
                options = options.with_stats_file(stats);
            }
            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new(properties.frame_count)?);
                options = options
                    .with_progress(progress.clone())
                    .with_batch_size(10);
                Some(progress)
            } else {
                None
            };

            let report = SceneAnalyzer::new(config)?
                .with_options(options)
                .analyze(&mut source)?;
            if let Some(progress) = progress {
                progress.bar.finish_with_message("done");
            }

            print_report(&report, &output, cli.global.overwrite)?;

            if let Some(directory) = split {
                let clips = VideoSplitter::new(&input, &directory)
                    .with_mode(split_mode)
                    .run(&report.scenes)?;
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!("Wrote {} clip(s) to {}", clips.len(), directory.display()).green()
                );
            }
        }
        Commands::Replay {
            stats,
            detector,
            output,
        } => {
            let file = StatsFile::load(&stats)?;
            let config = build_config(&detector, file.header().frames_per_second())?;
            let report = SceneAnalyzer::new(config)?.analyze_stats(&file)?;
            print_report(&report, &output, cli.global.overwrite)?;
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scenecut", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
