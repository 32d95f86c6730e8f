//! The external media tools behind a trait.
//!
//! `FfmpegBackend` shells out to ffprobe and ffmpeg. The batch processor
//! only sees `MediaBackend`, so tests can substitute a fake.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::io::{CommandRunner, ToolError};
use crate::logging::JobLogger;
use crate::models::{Metadata, MuxJob};
use crate::probe::{DurationProbe, ProbeResult};

use super::options_builder::{format_tokens_pretty, FfmpegOptionsBuilder};

/// Probe and mux operations the batch processor needs.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Duration of a media file in seconds (with the fallback applied).
    async fn probe_duration(&self, path: &Path, cancel: &CancellationToken) -> ProbeResult<f64>;

    /// Write `job.write_path()` from the job's video and song.
    async fn mux(
        &self,
        job: &MuxJob,
        offset_secs: f64,
        metadata: &Metadata,
        cancel: &CancellationToken,
        logger: &JobLogger,
    ) -> Result<(), ToolError>;
}

/// ffprobe + ffmpeg backed implementation.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    probe: DurationProbe,
    ffmpeg: CommandRunner,
}

impl FfmpegBackend {
    pub fn new(probe: DurationProbe, ffmpeg: CommandRunner) -> Self {
        Self { probe, ffmpeg }
    }

    /// Build from the `[tools]` and `[processing]` sections.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            DurationProbe::from_settings(settings),
            CommandRunner::new(&settings.tools.ffmpeg_path, settings.tools.mux_timeout()),
        )
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, path: &Path, cancel: &CancellationToken) -> ProbeResult<f64> {
        self.probe.duration_secs(path, cancel).await
    }

    async fn mux(
        &self,
        job: &MuxJob,
        offset_secs: f64,
        metadata: &Metadata,
        cancel: &CancellationToken,
        logger: &JobLogger,
    ) -> Result<(), ToolError> {
        let tokens = FfmpegOptionsBuilder::new(
            job.video.path(),
            job.song.path(),
            job.write_path(),
            offset_secs,
            metadata,
        )
        .build();

        let tool = self.ffmpeg.tool_name();
        logger.command(&format!("{} {}", tool, tokens.join(" ")));
        logger.debug(&format_tokens_pretty(&tokens));

        match self.ffmpeg.run(&tokens, cancel).await {
            Ok(output) => {
                // -v error still reports recoverable problems on stderr
                for line in output.stderr.lines() {
                    logger.output_line(line, true);
                }
                Ok(())
            }
            Err(err) => {
                if let ToolError::Failed { message, .. } = &err {
                    for line in message.lines() {
                        logger.output_line(line, true);
                    }
                    logger.show_tail("ffmpeg output");
                }
                Err(err)
            }
        }
    }
}
