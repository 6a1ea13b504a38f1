//! charuco-live: live ChArUco board viewer.
//!
//! Keys: `S` saves the raw frame, `Q` (or `Esc`, or closing the window) quits.

use std::path::PathBuf;
use std::process::ExitCode;

use charuco_live::camera::{
    list_cameras, open_camera, CameraSelector, FrameSource, ReplaySource,
};
use charuco_live::display::{NullDisplay, WindowDisplay};
use charuco_live::session::{self, SessionOptions, SessionSummary};
use charuco_live::{AppConfig, SnapshotWriter};
use clap::{Parser, ValueEnum};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "charuco-live")]
#[command(about = "Show a live camera stream with ChArUco board detections")]
#[command(version)]
struct Cli {
    /// Camera serial number. Opens the first camera when omitted.
    serial: Option<String>,

    /// Viewer config (JSON). Defaults to ./charuco_live.json when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay the images of a directory instead of opening a camera.
    #[arg(long, value_name = "DIR")]
    replay: Option<PathBuf>,

    /// Directory for saved frames (overrides the config).
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also save the annotated frame when a board is visible.
    #[arg(long)]
    save_annotated: bool,

    /// Run without a window until the replay ends (needs --replay).
    #[arg(long, requires = "replay")]
    headless: bool,

    /// Print attached cameras and exit.
    #[arg(long)]
    list: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Emit JSON log lines.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        let filter = cli.log_level.to_filter().to_string().to_lowercase();
        charuco_live::core::init_tracing(&filter, cli.json_log);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = charuco_live::core::init_with_level(cli.log_level.to_filter()) {
            eprintln!("warning: logger not installed: {e}");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if cli.list {
        return run_list();
    }

    let cwd = std::env::current_dir()?;
    let mut cfg = AppConfig::resolve(cli.config.as_deref(), &cwd)?;
    if let Some(dir) = cli.output_dir {
        cfg.output_dir = dir;
    }
    cfg.save_annotated |= cli.save_annotated;

    let detector = cfg.build_detector()?;
    let spec = detector.board().spec();
    log::info!(
        "board {}x{} squares, {} markers, dictionary {}",
        spec.cols,
        spec.rows,
        detector.board().marker_count(),
        detector.board().dictionary().name
    );

    let mut source: Box<dyn FrameSource> = match &cli.replay {
        Some(dir) => Box::new(ReplaySource::open(dir, cli.serial.clone())?),
        None => open_camera(
            &CameraSelector::from_serial(cli.serial.clone()),
            cfg.grab_timeout(),
        )?,
    };
    let snapshots = SnapshotWriter::new(cfg.output_dir(), source.serial());
    let options = SessionOptions {
        save_annotated: cfg.save_annotated,
        stop_at_end_of_stream: cli.replay.is_some(),
    };

    let summary = if cli.headless {
        session::run(&mut source, &detector, &mut NullDisplay, &snapshots, options)?
    } else {
        let mut window = WindowDisplay::new();
        session::run(&mut source, &detector, &mut window, &snapshots, options)?
    };
    print_summary(&summary);
    Ok(())
}

fn run_list() -> CliResult<()> {
    let cameras = list_cameras()?;
    if cameras.is_empty() {
        println!("no cameras attached");
    }
    for cam in cameras {
        println!("{}\t{}\t{}", cam.serial, cam.name, cam.path.display());
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "{} frames, {} with board, {} snapshots",
        summary.frames, summary.frames_with_board, summary.snapshots
    );
    if summary.snapshot_failures > 0 {
        println!("{} snapshots failed", summary.snapshot_failures);
    }
}
