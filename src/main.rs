use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod demo;
mod error;
mod player;
mod render;
mod sink;
mod source;
mod terminal_setup;

use demo::{DemoSource, DEFAULT_DEMO_SECONDS};
use player::{PlaybackConfig, Player, StopSignal};
use sink::CrosstermSink;
use source::{ffmpeg, FfmpegSource, FrameDirectory, FrameSource};
use terminal_setup::{install_interrupt_handler, install_panic_hook, ExitCleanup};

#[derive(Debug, Parser)]
#[command(
    name = "quadplay",
    version,
    about = "Play video in the terminal as truecolor quadrant-block art"
)]
struct Cli {
    /// Path to the video file to play
    #[arg(conflicts_with_all = ["demo", "frames"])]
    input: Option<PathBuf>,
    /// Output width in character columns [default: 80]
    width: Option<usize>,
    /// Output height in character rows [default: 24]
    height: Option<usize>,
    /// Playback frame rate [default: 15]
    fps: Option<f64>,
    #[arg(long, help = "Render without color")]
    mono: bool,
    #[arg(long, help = "Print ffprobe stream information and exit")]
    info: bool,
    #[arg(long, help = "Play the built-in procedural animation")]
    demo: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Play frame_0001.png, frame_0002.png, ... from an existing directory"
    )]
    frames: Option<PathBuf>,
}

impl Cli {
    fn playback_config(&self) -> PlaybackConfig {
        let defaults = PlaybackConfig::default();
        PlaybackConfig {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            fps: self.fps.unwrap_or(defaults.fps),
            color: !self.mono,
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_usage() {
    println!("Usage: quadplay <VIDEO> [WIDTH] [HEIGHT] [FPS]");
    println!("Example: quadplay video/clip.mp4 100 30 24");
    println!("         quadplay --demo");
}

fn print_ffmpeg_guidance() {
    print_tool_guidance("ffmpeg");
}

fn print_ffprobe_guidance() {
    print_tool_guidance("ffprobe");
    println!("ffprobe ships with ffmpeg.");
}

fn print_tool_guidance(tool: &str) {
    println!("Error: {tool} is required");
    println!("Install it with:");
    println!("  macOS: brew install ffmpeg");
    println!("  Ubuntu: sudo apt install ffmpeg");
    println!("  Windows: download ffmpeg and add it to PATH");
}

fn print_banner(input: &Path, config: &PlaybackConfig) {
    println!("Terminal video player");
    println!("Video file: {}", input.display());
    println!("Output size: {}x{}", config.width, config.height);
    println!("Playback rate: {:.1} FPS", config.fps);
    println!();
}

fn play<S: FrameSource>(
    mut source: S,
    input: &Path,
    config: PlaybackConfig,
    exit_cleanup: ExitCleanup,
) -> anyhow::Result<()> {
    let stop = StopSignal::default();
    install_interrupt_handler(stop.clone(), exit_cleanup.clone())?;

    println!("Extracting frames...");
    source
        .prepare(input, config.width, config.height, config.fps)
        .with_context(|| format!("failed to prepare '{}'", input.display()))?;

    println!("Starting playback (Ctrl+C to stop)...");
    std::thread::sleep(Duration::from_secs(1));

    install_panic_hook(exit_cleanup.clone());
    let sink = CrosstermSink::stdout().with_exit_cleanup(exit_cleanup);
    let mut player = Player::new(source, sink, config)?.with_stop_signal(stop);
    let report = player.start()?;
    tracing::info!(
        frames = report.frames_rendered,
        last_index = report.last_index,
        "done"
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.playback_config();
    config.validate()?;
    let exit_cleanup = ExitCleanup::default();

    if cli.demo {
        let demo = DemoSource::with_duration(DEFAULT_DEMO_SECONDS, config.fps, rand::random());
        print_banner(Path::new("<demo>"), &config);
        return play(demo, Path::new("<demo>"), config, exit_cleanup);
    }

    if let Some(dir) = cli.frames.as_deref() {
        print_banner(dir, &config);
        return play(FrameDirectory::new(dir), dir, config, exit_cleanup);
    }

    let Some(input) = cli.input.as_deref() else {
        print_usage();
        return Ok(());
    };

    if !input.exists() {
        println!("Video file not found: {}", input.display());
        return Ok(());
    }

    if cli.info {
        if !ffmpeg::is_ffprobe_on_path() {
            print_ffprobe_guidance();
            return Ok(());
        }
        let info = ffmpeg::probe(input)?;
        println!("Video info:\n{info}");
        return Ok(());
    }

    if !ffmpeg::is_ffmpeg_on_path() {
        print_ffmpeg_guidance();
        return Ok(());
    }

    print_banner(input, &config);
    let source = FfmpegSource::new().with_exit_cleanup(exit_cleanup.clone());
    play(source, input, config, exit_cleanup)
}
