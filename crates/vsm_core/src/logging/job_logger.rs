//! Logger for one request (or one pair of a request).
//!
//! Lines go to an optional `<name>.log` file and, unless disabled, to
//! `tracing` with a `job` field. Tool output is kept in a bounded tail
//! that is dumped when the tool fails.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, MessagePrefix};

/// Mutable part of a logger, behind one lock.
#[derive(Default)]
struct Sink {
    file: Option<BufWriter<File>>,
    tail: VecDeque<String>,
    last_progress: u32,
}

impl Sink {
    fn write_line(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }

    fn remember(&mut self, line: &str, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.tail.len() >= limit {
            self.tail.pop_front();
        }
        self.tail.push_back(line.to_string());
    }
}

pub struct JobLogger {
    name: String,
    config: LogConfig,
    sink: Mutex<Sink>,
}

impl JobLogger {
    /// Log to `<log_dir>/<name>.log`, creating the directory if needed.
    pub fn new(name: impl Into<String>, log_dir: impl AsRef<Path>, config: LogConfig) -> io::Result<Self> {
        let name = name.into();
        fs::create_dir_all(log_dir.as_ref())?;
        let path = log_dir.as_ref().join(format!("{}.log", file_safe(&name)));
        let file = BufWriter::new(File::create(&path)?);

        let mut logger = Self::detached(name, config);
        logger.sink.get_mut().file = Some(file);
        Ok(logger)
    }

    /// A logger without a file.
    pub fn detached(name: impl Into<String>, config: LogConfig) -> Self {
        Self {
            name: name.into(),
            config,
            sink: Mutex::new(Sink::default()),
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.sink.lock().write_line(&self.stamp(message));
        self.mirror(level, message);
    }

    fn prefixed(&self, level: LogLevel, prefix: MessagePrefix, message: &str) {
        self.log(level, &prefix.format(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.prefixed(LogLevel::Warn, MessagePrefix::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.prefixed(LogLevel::Error, MessagePrefix::Error, message);
    }

    pub fn command(&self, command: &str) {
        self.prefixed(LogLevel::Info, MessagePrefix::Command, command);
    }

    pub fn phase(&self, name: &str) {
        self.prefixed(LogLevel::Info, MessagePrefix::Phase, name);
    }

    pub fn section(&self, name: &str) {
        self.prefixed(LogLevel::Info, MessagePrefix::Section, name);
    }

    pub fn success(&self, message: &str) {
        self.prefixed(LogLevel::Info, MessagePrefix::Success, message);
    }

    /// Log a progress percentage. In compact mode only the first value
    /// reaching each `progress_step` boundary (and 100) is logged.
    ///
    /// Returns whether the value was logged.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let mut sink = self.sink.lock();
            let crossed = percent / step > sink.last_progress / step;
            if !crossed && percent < 100 {
                return false;
            }
            sink.last_progress = percent;
        }
        self.log(LogLevel::Info, &format!("Progress: {}%", percent));
        true
    }

    /// One line of tool output. Always kept in the tail; logged at debug
    /// level only outside compact mode.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        self.sink.lock().remember(line, self.config.error_tail);
        if !self.config.compact {
            let stream = if is_stderr { "[stderr] " } else { "" };
            self.log(LogLevel::Debug, &format!("{}{}", stream, line));
        }
    }

    /// Dump the tail under a `[header/tail]` marker, as errors.
    pub fn show_tail(&self, header: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }
        {
            let mut sink = self.sink.lock();
            sink.write_line(&self.stamp(&format!("[{}/tail]", header)));
            for line in &lines {
                sink.write_line(&self.stamp(line));
            }
        }
        for line in &lines {
            self.mirror(LogLevel::Error, line);
        }
    }

    pub fn tail(&self) -> Vec<String> {
        self.sink.lock().tail.iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    fn stamp(&self, message: &str) -> String {
        if !self.config.show_timestamps {
            return message.to_string();
        }
        format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
    }

    fn mirror(&self, level: LogLevel, message: &str) {
        if !self.config.mirror_to_tracing {
            return;
        }
        let job = self.name.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(job, "{}", message),
            LogLevel::Debug => tracing::debug!(job, "{}", message),
            LogLevel::Info => tracing::info!(job, "{}", message),
            LogLevel::Warn => tracing::warn!(job, "{}", message),
            LogLevel::Error => tracing::error!(job, "{}", message),
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Keep `[A-Za-z0-9._-]`, replace the rest with `_`.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
