//! Per-pair outcomes and the batch report.

use std::path::{Path, PathBuf};

use crate::models::MuxJob;
use crate::mux::MuxError;

use super::cleanup::CleanupReport;

/// What happened to one pair.
#[derive(Debug)]
pub enum PairStatus {
    Succeeded {
        output_path: PathBuf,
        /// Probed (or fallback) video duration.
        duration_secs: f64,
        /// Audio start offset used.
        offset_secs: f64,
    },
    Failed(MuxError),
}

/// Result of processing one (video, song) pair.
#[derive(Debug)]
pub struct PairOutcome {
    /// Position in video-major, song-minor order.
    pub index: usize,
    pub video_name: String,
    pub song_name: String,
    pub video_path: PathBuf,
    pub song_path: PathBuf,
    pub status: PairStatus,
}

impl PairOutcome {
    pub fn succeeded(job: &MuxJob, duration_secs: f64, offset_secs: f64) -> Self {
        Self::from_job(
            job,
            PairStatus::Succeeded {
                output_path: job.output_path.clone(),
                duration_secs,
                offset_secs,
            },
        )
    }

    pub fn failed(job: &MuxJob, error: MuxError) -> Self {
        Self::from_job(job, PairStatus::Failed(error))
    }

    fn from_job(job: &MuxJob, status: PairStatus) -> Self {
        Self {
            index: job.index,
            video_name: job.video.original_name.clone(),
            song_name: job.song.original_name.clone(),
            video_path: job.video.temp_path.clone(),
            song_path: job.song.temp_path.clone(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, PairStatus::Succeeded { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.status {
            PairStatus::Succeeded { output_path, .. } => Some(output_path),
            PairStatus::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&MuxError> {
        match &self.status {
            PairStatus::Failed(e) => Some(e),
            PairStatus::Succeeded { .. } => None,
        }
    }

    /// One line for the response body.
    pub fn summary(&self) -> String {
        match &self.status {
            PairStatus::Succeeded { output_path, .. } => format!(
                "{} + {} -> {}",
                self.video_name,
                self.song_name,
                output_path.display()
            ),
            PairStatus::Failed(e) => format!("[{}] {}", e.kind(), e),
        }
    }
}

/// Everything one upload request produced.
#[derive(Debug)]
pub struct BatchReport {
    pub request_id: String,
    /// One entry per pair, in video-major order.
    pub outcomes: Vec<PairOutcome>,
    pub cleanup: CleanupReport,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(PairOutcome::is_success)
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PairOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(PairOutcome::output_path)
    }
}
