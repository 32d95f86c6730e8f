//! Duration probing using `ffprobe -show_entries format=duration -of json`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::io::{CommandRunner, ToolError};

/// Errors from probing a media file.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The file to probe does not exist.
    #[error("Error getting video duration for {}: file not found", .0.display())]
    FileNotFound(PathBuf),

    /// ffprobe failed, timed out or was cancelled.
    #[error("Error getting video duration for {}: {source}", .path.display())]
    Tool {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    /// ffprobe output was not the expected JSON.
    #[error("Error getting video duration for {}: unreadable ffprobe output: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl ProbeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProbeError::Tool { source, .. } if source.is_cancelled())
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Reads media durations, falling back to a fixed value when unknown.
#[derive(Debug, Clone)]
pub struct DurationProbe {
    runner: CommandRunner,
    fallback_secs: f64,
}

impl DurationProbe {
    pub fn new(runner: CommandRunner, fallback_secs: f64) -> Self {
        Self {
            runner,
            fallback_secs,
        }
    }

    /// Build from the `[tools]` and `[processing]` sections.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            CommandRunner::new(&settings.tools.ffprobe_path, settings.tools.probe_timeout()),
            settings.processing.fallback_duration_secs,
        )
    }

    /// Get the duration of a media file in seconds.
    ///
    /// A file whose container reports no usable duration yields the
    /// fallback rather than an error. Tool failures are propagated.
    pub async fn duration_secs(&self, path: &Path, cancel: &CancellationToken) -> ProbeResult<f64> {
        if !path.exists() {
            return Err(ProbeError::FileNotFound(path.to_path_buf()));
        }

        tracing::debug!("Probing duration: {}", path.display());

        let output = self
            .runner
            .run(probe_args(path), cancel)
            .await
            .map_err(|source| ProbeError::Tool {
                path: path.to_path_buf(),
                source,
            })?;

        let json: Value =
            serde_json::from_str(&output.stdout).map_err(|e| ProbeError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        match parse_duration(&json) {
            Some(secs) => Ok(secs),
            None => {
                tracing::info!(
                    "No duration reported for {}, assuming {}s",
                    path.display(),
                    self.fallback_secs
                );
                Ok(self.fallback_secs)
            }
        }
    }
}

/// Arguments asking ffprobe for the container duration as JSON.
fn probe_args(path: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "json".into(),
        path.as_os_str().to_owned(),
    ]
}

/// Extract `format.duration` from ffprobe JSON.
///
/// ffprobe prints the duration as a string; numbers are accepted too.
/// Missing, zero, negative or non-finite values count as unknown.
pub fn parse_duration(json: &Value) -> Option<f64> {
    let raw = json.get("format")?.get("duration")?;
    let secs = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
