//! Error types for muxing one (video, song) pair.
//!
//! Errors carry context that chains through layers:
//! Pair → Probe/Tool → Detail

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::io::ToolError;
use crate::probe::ProbeError;

/// Why a pair did not produce an output file.
#[derive(Error, Debug)]
pub enum MuxError {
    /// The video duration could not be read.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// ffmpeg failed, timed out or was cancelled.
    #[error("ffmpeg error for video: {}, song: {}, error: {source}", .video.display(), .song.display())]
    Tool {
        video: PathBuf,
        song: PathBuf,
        #[source]
        source: ToolError,
    },

    /// The output name is taken and the policy forbids reuse.
    #[error("Output file name already taken: {}", .path.display())]
    Collision { path: PathBuf },

    /// The batch was cancelled before this pair started.
    #[error("Cancelled before processing video: {}, song: {}", .video.display(), .song.display())]
    Cancelled { video: PathBuf, song: PathBuf },

    /// Filesystem error around the mux (output dir, reservation).
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl MuxError {
    pub fn tool(video: &Path, song: &Path, source: ToolError) -> Self {
        Self::Tool {
            video: video.to_path_buf(),
            song: song.to_path_buf(),
            source,
        }
    }

    pub fn collision(path: impl Into<PathBuf>) -> Self {
        Self::Collision { path: path.into() }
    }

    pub fn cancelled(video: &Path, song: &Path) -> Self {
        Self::Cancelled {
            video: video.to_path_buf(),
            song: song.to_path_buf(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Short error class for reports: probe, mux, collision, cancelled, io.
    pub fn kind(&self) -> &'static str {
        match self {
            MuxError::Probe(e) if e.is_cancelled() => "cancelled",
            MuxError::Probe(_) => "probe",
            MuxError::Tool { source, .. } if source.is_cancelled() => "cancelled",
            MuxError::Tool { .. } => "mux",
            MuxError::Collision { .. } => "collision",
            MuxError::Cancelled { .. } => "cancelled",
            MuxError::Io { .. } => "io",
        }
    }
}
