//! Logging infrastructure for dubmux.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer of ffmpeg output for failure diagnosis
//! - Global `tracing` subscriber setup, optionally with a rolling log file
//!
//! # Example
//!
//! ```no_run
//! use dubmux_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("job-42", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Mux");
//! logger.command("ffmpeg -y -i video.mp4 -i narration.wav ...");
//! logger.progress(50);
//! logger.success("Mux completed");
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to `default_level`, and writes to
/// stderr. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .init();
}

/// Initialize the global subscriber with an additional daily-rolling file
/// in `log_dir`.
///
/// The returned guard must be kept alive for buffered lines to reach disk.
pub fn init_tracing_with_file(default_level: LogLevel, log_dir: &Path) -> WorkerGuard {
    let (subscriber, guard) = file_subscriber(default_level, log_dir);
    subscriber.init();
    guard
}

fn file_subscriber(
    default_level: LogLevel,
    log_dir: &Path,
) -> (impl tracing::Subscriber + Send + Sync + 'static, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(log_dir, "dubmux.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level));
    (subscriber, guard)
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}
