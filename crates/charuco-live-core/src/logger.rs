//! Stderr logger for the live viewer.
//!
//! Lines look like `[  1.234s  INFO] charuco_live::session: frame 12`.
//! Module paths are trimmed to their first two segments.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    started: Instant,
}

fn short_target(target: &str) -> &str {
    // "a::b::c::d" -> "a::b"
    match target.match_indices("::").nth(1) {
        Some((idx, _)) => &target[..idx],
        None => target,
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let t = self.started.elapsed().as_secs_f64();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[{t:7.3}s {:>5}] {}: {}",
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls only adjust the max level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            started: Instant::now(),
        });
        log::set_logger(logger)?;
    }
    log::set_max_level(level);
    Ok(())
}

/// Route `log` records and `tracing` spans through a `tracing-subscriber`.
///
/// The filter comes from `RUST_LOG`, falling back to `default_filter`.
/// Span close events carry their busy time, which is how per-stage
/// detection timings show up.
#[cfg(feature = "tracing")]
pub fn init_tracing(default_filter: &str, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = tracing_log::LogTracer::init();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
