use std::io::BufRead as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use timewarp::{CutConfig, FourCc, Fps, FrameRange, QuitSignal, ScaleFactor, WarpConfig};

#[derive(Parser, Debug)]
#[command(name = "timewarp", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Swap the time axis with a spatial axis (requires `ffmpeg` on PATH).
    Warp(WarpArgs),
    /// Copy a frame range, rescaled (requires `ffmpeg` on PATH).
    Cut(CutArgs),
    /// Print input metadata.
    Stats(StatsArgs),
}

#[derive(Parser, Debug)]
struct WarpArgs {
    /// Load every setting from a JSON config instead of the flags below.
    #[arg(long, conflicts_with_all = ["in_path", "out"])]
    config: Option<PathBuf>,

    /// Input video.
    #[arg(long = "in", required_unless_present = "config")]
    in_path: Option<PathBuf>,

    /// Output video.
    #[arg(long, required_unless_present = "config")]
    out: Option<PathBuf>,

    /// Output codec FourCC.
    #[arg(long, default_value = "H264")]
    codec: FourCc,

    /// Spatial axis to swap with time (`x` or `y`).
    #[arg(long, default_value = "x")]
    axis: String,

    /// Horizontal output scale.
    #[arg(long, default_value_t = 2.0)]
    scale_x: f64,

    /// Vertical output scale.
    #[arg(long, default_value_t = 1.0)]
    scale_y: f64,

    /// Uniform scale applied while reading.
    #[arg(long, default_value_t = 1.0)]
    read_scale: f64,

    /// Output frame rate (`30`, `30000/1001`, `29.97`).
    #[arg(long, default_value = "30")]
    fps: Fps,

    /// Write each emitted frame to a PNG snapshot; type `q` + Enter to stop early.
    #[arg(long)]
    preview: bool,

    /// Snapshot path used by `--preview`.
    #[arg(long, default_value = "preview.png")]
    preview_path: PathBuf,

    /// Do not write the output video.
    #[arg(long)]
    no_write: bool,

    /// Refuse to replace an existing output.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Parser, Debug)]
struct CutArgs {
    /// Load every setting from a JSON config instead of the flags below.
    #[arg(long, conflicts_with_all = ["in_path", "out"])]
    config: Option<PathBuf>,

    /// Input video.
    #[arg(long = "in", required_unless_present = "config")]
    in_path: Option<PathBuf>,

    /// Output video.
    #[arg(long, required_unless_present_any = ["config", "stats_only"])]
    out: Option<PathBuf>,

    /// Output codec FourCC.
    #[arg(long, default_value = "H264")]
    codec: FourCc,

    /// Output width; used only together with `--height`.
    #[arg(long)]
    width: Option<u32>,

    /// Output height; used only together with `--width`.
    #[arg(long)]
    height: Option<u32>,

    /// Uniform scale when no explicit size is given.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Output frame rate.
    #[arg(long, default_value = "30")]
    fps: Fps,

    /// First frame to keep (0-based, inclusive).
    #[arg(long)]
    first: Option<u64>,

    /// Last frame to keep (0-based, inclusive).
    #[arg(long)]
    last: Option<u64>,

    /// Only print input metadata; write nothing.
    #[arg(long)]
    stats_only: bool,

    /// Refuse to replace an existing output.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Parser, Debug)]
struct StatsArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Warp(args) => cmd_warp(args),
        Command::Cut(args) => cmd_cut(args),
        Command::Stats(args) => cmd_stats(args),
    }
}

fn cmd_warp(args: WarpArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => timewarp::load_json::<WarpConfig>(path)?,
        None => WarpConfig {
            codec: args.codec,
            axis: args.axis,
            out_scale: ScaleFactor::new(args.scale_x, args.scale_y)?,
            read_scale: ScaleFactor::uniform(args.read_scale)?,
            fps: args.fps,
            preview: args.preview,
            preview_path: args.preview_path,
            write: !args.no_write,
            overwrite: !args.no_overwrite,
            ..WarpConfig::new(
                args.in_path.unwrap_or_default(),
                args.out.unwrap_or_default(),
            )
        },
    };

    let quit = QuitSignal::new();
    if cfg.preview {
        watch_stdin_for_quit(quit.clone());
    }
    let report = timewarp::run_warp(&cfg, quit)?;
    if let Some(e) = &report.axis_error {
        eprintln!("warning: {e}; frames written unwarped");
    }
    match &report.emit {
        Ok(emit) => {
            if let Some(e) = &emit.failure {
                eprintln!(
                    "output failed: {e} ({} of {} frames written, {} read of {} expected)",
                    emit.written, emit.seen, report.ingest.read, report.ingest.expected
                );
            } else if cfg.write {
                eprintln!("wrote {} ({} frames)", cfg.output.display(), emit.written);
            }
        }
        Err(e) => eprintln!("nothing written: {e}"),
    }
    Ok(())
}

fn cmd_cut(args: CutArgs) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => timewarp::load_json::<CutConfig>(path)?,
        None => CutConfig {
            codec: args.codec,
            width: args.width,
            height: args.height,
            scale: args.scale,
            fps: args.fps,
            range: FrameRange::new(args.first, args.last)?,
            stats_only: args.stats_only,
            overwrite: !args.no_overwrite,
            ..CutConfig::new(
                args.in_path.unwrap_or_default(),
                args.out.unwrap_or_default(),
            )
        },
    };

    if cfg.stats_only {
        cfg.validate()?;
        let info = timewarp::stats(&cfg.input)?;
        print_stats(&info);
        return Ok(());
    }

    if let Some(report) = timewarp::run_cut(&cfg)? {
        match &report.emit.failure {
            Some(e) => eprintln!(
                "output failed: {e} ({} written, {} of {} expected frames read)",
                report.emit.written, report.seen, report.expected
            ),
            None => eprintln!(
                "wrote {} ({} of {} frames)",
                cfg.output.display(),
                report.emit.written,
                report.seen
            ),
        }
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> anyhow::Result<()> {
    let info = timewarp::stats(&args.in_path)?;
    print_stats(&info);
    Ok(())
}

fn print_stats(info: &timewarp::StreamInfo) {
    println!("path: {}", info.path.display());
    println!("codec: {}", info.codec_label());
    println!("size: {}", info.size());
    println!("fps: {} ({}/{})", info.fps, info.fps.num, info.fps.den);
    println!("frames: {}", info.expected_frames);
}

/// Raise `quit` when a line reading `q` arrives on stdin.
fn watch_stdin_for_quit(quit: QuitSignal) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("q") {
                quit.trigger();
                break;
            }
        }
    });
}
