//! Logging infrastructure for Video Song Muxer.
//!
//! This module provides:
//! - Application-wide `tracing` setup (stderr + daily rolling file)
//! - Per-request loggers with an optional dedicated log file
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//!
//! # Example
//!
//! ```no_run
//! use vsm_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("request-42", "/path/to/logs", LogConfig::default()).unwrap();
//!
//! logger.phase("Mux");
//! logger.command("ffmpeg -y -i video.mp4 -ss 3.210 -i song.mp3 ...");
//! logger.progress(50);
//! logger.success("Batch completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for the rolling service log.
const SERVICE_LOG_PREFIX: &str = "video-song-muxer.log";

/// Initialize tracing with stderr output plus a daily rolling log file.
///
/// The returned guard must be held for the lifetime of the process;
/// dropping it flushes and stops the background file writer.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(logs_dir, SERVICE_LOG_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(env_filter(default_level))
        .init();

    guard
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)))
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Info), "info");
    }
}
