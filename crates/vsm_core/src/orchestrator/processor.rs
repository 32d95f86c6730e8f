//! Batch processor: turns one upload request into `videos × songs` outputs.
//!
//! Pairs are planned sequentially (output names must be reserved in a
//! stable order) and then muxed on a bounded pool. Results come back in
//! video-major, song-minor order regardless of completion order, and a
//! failing pair never stops the others.
//!
//! ffmpeg writes to a staging file next to the output; only a finished
//! mux is renamed into place.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::{ProcessingSettings, Settings};
use crate::logging::{JobLogger, LogConfig};
use crate::models::{Metadata, MuxJob, UploadSet};
use crate::mux::{output_path, MediaBackend, MuxError, OffsetSource, OutputReserver, Reservation};

use super::cleanup::UploadDir;
use super::types::{BatchReport, PairOutcome};

/// A pair after output reservation.
///
/// A `Ready` pair owns its reservation, so dropping the batch future
/// releases every name it has not committed.
#[derive(Debug)]
enum Planned {
    Ready { job: MuxJob, reservation: Reservation },
    Rejected { job: MuxJob, error: MuxError },
}

/// Runs the (video, song) pairs of a request against a media backend.
pub struct BatchProcessor {
    backend: Arc<dyn MediaBackend>,
    output_dir: PathBuf,
    processing: ProcessingSettings,
    /// Where request and per-pair log files go; None keeps logging in
    /// `tracing` only.
    logs_dir: Option<PathBuf>,
    log_config: LogConfig,
}

impl BatchProcessor {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        output_dir: impl Into<PathBuf>,
        processing: ProcessingSettings,
    ) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            processing,
            logs_dir: None,
            log_config: LogConfig::default(),
        }
    }

    pub fn from_settings(settings: &Settings, backend: Arc<dyn MediaBackend>) -> Self {
        let mut processor = Self::new(
            backend,
            settings.paths.output_dir(),
            settings.processing.clone(),
        )
        .with_log_config(LogConfig::from_settings(&settings.logging));
        if settings.logging.request_logs {
            processor = processor.with_request_logs(settings.paths.logs_dir());
        }
        processor
    }

    /// Write `<request-id>.log` plus one log file per pair into `dir`.
    pub fn with_request_logs(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    /// Run every pair, then remove the request's uploads.
    ///
    /// Cleanup happens whatever the pair outcomes are; its failures are
    /// reported separately and never turn a pair into a failure.
    pub async fn process(
        &self,
        request_id: &str,
        upload_dir: UploadDir,
        uploads: &UploadSet,
        metadata: &Metadata,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let outcomes = self.run(request_id, uploads, metadata, cancel).await;
        let cleanup = upload_dir.cleanup().await;

        BatchReport {
            request_id: request_id.to_string(),
            outcomes,
            cleanup,
        }
    }

    /// Mux every (video, song) pair and return one outcome per pair.
    pub async fn run(
        &self,
        request_id: &str,
        uploads: &UploadSet,
        metadata: &Metadata,
        cancel: &CancellationToken,
    ) -> Vec<PairOutcome> {
        let total = uploads.pair_count();
        let batch_log = self.logger(request_id);
        batch_log.phase(&format!(
            "{} video(s) x {} song(s) = {} pair(s)",
            uploads.videos.len(),
            uploads.songs.len(),
            total
        ));

        let planned = self.plan(uploads, metadata).await;
        let offsets = OffsetSource::from_seed(self.processing.offset_seed);

        let mut results = stream::iter(planned)
            .map(move |pair| self.run_pair(request_id, pair, metadata, offsets, cancel))
            .buffered(self.processing.parallelism());

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = results.next().await {
            outcomes.push(outcome);
            if total > 0 {
                batch_log.progress((outcomes.len() * 100 / total) as u32);
            }
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded == total {
            batch_log.success(&format!("All {} pair(s) muxed", total));
        } else {
            batch_log.warn(&format!("{} of {} pair(s) failed", total - succeeded, total));
        }
        outcomes
    }

    /// Build the pairs and reserve their output names, video-major.
    async fn plan(&self, uploads: &UploadSet, metadata: &Metadata) -> Vec<Planned> {
        let dir_error = tokio::fs::create_dir_all(&self.output_dir).await.err();
        let mut reserver = OutputReserver::new(self.processing.collision_policy);
        let mut planned = Vec::with_capacity(uploads.pair_count());

        for video in &uploads.videos {
            for song in &uploads.songs {
                let base = output_path(&metadata.title, &song.original_name, &self.output_dir);
                let index = planned.len();
                let job = |path| MuxJob::new(index, video.clone(), song.clone(), path);

                if let Some(e) = &dir_error {
                    planned.push(Planned::Rejected {
                        job: job(base),
                        error: MuxError::io(
                            format!("creating output dir {}", self.output_dir.display()),
                            io::Error::new(e.kind(), e.to_string()),
                        ),
                    });
                    continue;
                }

                planned.push(match reserver.reserve(base.clone()) {
                    Ok(reservation) => Planned::Ready {
                        job: job(reservation.path().to_path_buf())
                            .with_staging(reservation.staging_path()),
                        reservation,
                    },
                    Err(error) => Planned::Rejected {
                        job: job(base),
                        error,
                    },
                });
            }
        }

        planned
    }

    async fn run_pair(
        &self,
        request_id: &str,
        pair: Planned,
        metadata: &Metadata,
        offsets: OffsetSource,
        cancel: &CancellationToken,
    ) -> PairOutcome {
        let (job, reservation) = match pair {
            Planned::Ready { job, reservation } => (job, reservation),
            Planned::Rejected { job, error } => {
                tracing::warn!("Skipping {}: {}", job.label(), error);
                return PairOutcome::failed(&job, error);
            }
        };

        if cancel.is_cancelled() {
            reservation.release().await;
            return PairOutcome::failed(&job, MuxError::cancelled(job.video.path(), job.song.path()));
        }

        let logger = self.logger(&format!("{}-pair-{:02}", request_id, job.index + 1));
        logger.section(&job.label());

        let duration = match self.backend.probe_duration(job.video.path(), cancel).await {
            Ok(secs) => secs,
            Err(e) => {
                logger.error(&e.to_string());
                reservation.release().await;
                return PairOutcome::failed(&job, e.into());
            }
        };

        let offset = offsets.offset_for(job.index, duration, self.processing.max_offset_secs);
        logger.info(&format!(
            "Video duration {:.3}s, audio starts at {:.3}s",
            duration, offset
        ));

        match self.backend.mux(&job, offset, metadata, cancel, &logger).await {
            Ok(()) => match reservation.commit().await {
                Ok(()) => {
                    logger.success(&format!("Wrote {}", job.output_path.display()));
                    PairOutcome::succeeded(&job, duration, offset)
                }
                Err(e) => {
                    let error = MuxError::io(
                        format!("moving finished output to {}", job.output_path.display()),
                        e,
                    );
                    logger.error(&error.to_string());
                    PairOutcome::failed(&job, error)
                }
            },
            Err(source) => {
                // Only the staging file (and our placeholder) can be partial
                reservation.release().await;
                let error = MuxError::tool(job.video.path(), job.song.path(), source);
                logger.error(&error.to_string());
                PairOutcome::failed(&job, error)
            }
        }
    }

    /// File-backed logger when request logs are enabled.
    fn logger(&self, name: &str) -> JobLogger {
        let Some(dir) = &self.logs_dir else {
            return JobLogger::detached(name, self.log_config.clone());
        };
        match JobLogger::new(name, dir, self.log_config.clone()) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!("Could not create log file for {} in {}: {}", name, dir.display(), e);
                JobLogger::detached(name, self.log_config.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crate::io::ToolError;
    use crate::models::{CollisionPolicy, FieldGroup, UploadedFile};
    use crate::probe::{ProbeError, ProbeResult};
    use crate::orchestrator::PairStatus;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Backend that writes a marker file instead of running ffmpeg.
    #[derive(Default)]
    struct FakeBackend {
        duration: f64,
        /// Probe fails for video paths containing this.
        probe_fails_for: Option<&'static str>,
        /// Mux fails (after writing partial output) for songs named this.
        mux_fails_for: Option<&'static str>,
        /// Mux never finishes.
        hangs: bool,
        offsets: Mutex<Vec<(usize, f64)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeBackend {
        fn with_duration(duration: f64) -> Self {
            Self {
                duration,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl MediaBackend for FakeBackend {
        async fn probe_duration(&self, path: &Path, cancel: &CancellationToken) -> ProbeResult<f64> {
            if let Some(needle) = self.probe_fails_for {
                if path.to_string_lossy().contains(needle) {
                    return Err(ProbeError::Tool {
                        path: path.to_path_buf(),
                        source: ToolError::failed("ffprobe", 1, "Invalid data found"),
                    });
                }
            }
            if cancel.is_cancelled() {
                return Err(ProbeError::Tool {
                    path: path.to_path_buf(),
                    source: ToolError::Cancelled {
                        tool: "ffprobe".into(),
                    },
                });
            }
            Ok(self.duration)
        }

        async fn mux(
            &self,
            job: &MuxJob,
            offset_secs: f64,
            _metadata: &Metadata,
            _cancel: &CancellationToken,
            _logger: &JobLogger,
        ) -> Result<(), ToolError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.offsets.lock().push((job.index, offset_secs));
            if self.hangs {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.mux_fails_for == Some(job.song.original_name.as_str()) {
                std::fs::write(job.write_path(), b"partial").unwrap();
                return Err(ToolError::failed("ffmpeg", 1, "Conversion failed!"));
            }
            std::fs::write(job.write_path(), b"muxed").unwrap();
            Ok(())
        }
    }

    struct Fixture {
        _root: TempDir,
        upload_base: PathBuf,
        output_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        crate::logging::init_test_tracing();
        let root = tempdir().unwrap();
        Fixture {
            upload_base: root.path().join("uploads"),
            output_dir: root.path().join("outputs"),
            _root: root,
        }
    }

    async fn uploads_in(
        base: &Path,
        videos: &[&str],
        songs: &[&str],
    ) -> (UploadDir, UploadSet) {
        let mut dir = UploadDir::create(base, "req").await.unwrap();
        let mut set = UploadSet::new();
        let files = videos
            .iter()
            .map(|n| (n, FieldGroup::Video))
            .chain(songs.iter().map(|n| (n, FieldGroup::Song)));
        for (i, (name, group)) in files.enumerate() {
            let path = dir.file_path(&format!("{}-{}", i, name));
            std::fs::write(&path, b"bytes").unwrap();
            dir.track(&path);
            set.push(UploadedFile::new(*name, path, group));
        }
        (dir, set)
    }

    fn metadata() -> Metadata {
        Metadata {
            title: "Demo".into(),
            ..Default::default()
        }
    }

    fn processor(backend: Arc<FakeBackend>, output_dir: &Path, processing: ProcessingSettings) -> BatchProcessor {
        BatchProcessor::new(backend, output_dir, processing)
    }

    #[tokio::test]
    async fn produces_one_outcome_per_pair_in_order() {
        let fx = fixture();
        let (dir, set) = uploads_in(&fx.upload_base, &["v1.mp4", "v2.mp4"], &["a.mp3", "b.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let batch = processor(backend, &fx.output_dir, ProcessingSettings::default());

        let report = batch
            .process("req", dir, &set, &metadata(), &CancellationToken::new())
            .await;

        assert!(report.all_succeeded());
        let pairs: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| (o.index, o.video_name.as_str(), o.song_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (0, "v1.mp4", "a.mp3"),
                (1, "v1.mp4", "b.mp3"),
                (2, "v2.mp4", "a.mp3"),
                (3, "v2.mp4", "b.mp3"),
            ]
        );

        let outputs: Vec<_> = report.outputs().map(Path::to_path_buf).collect();
        assert_eq!(
            outputs,
            vec![
                fx.output_dir.join("demo_a_mp3.mp4"),
                fx.output_dir.join("demo_b_mp3.mp4"),
                fx.output_dir.join("demo_a_mp3_1.mp4"),
                fx.output_dir.join("demo_b_mp3_1.mp4"),
            ]
        );
        for path in &outputs {
            assert_eq!(std::fs::read(path).unwrap(), b"muxed");
        }
    }

    #[tokio::test]
    async fn failing_pair_does_not_stop_others_and_leaves_no_partial_file() {
        let fx = fixture();
        let (dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["bad.mp3", "good.mp3"]).await;
        let backend = Arc::new(FakeBackend {
            duration: 30.0,
            mux_fails_for: Some("bad.mp3"),
            ..Default::default()
        });
        let batch = processor(backend, &fx.output_dir, ProcessingSettings::default());

        let report = batch
            .process("req", dir, &set, &metadata(), &CancellationToken::new())
            .await;

        assert_eq!(report.succeeded_count(), 1);
        let failed = report.failures().next().unwrap();
        assert_eq!(failed.song_name, "bad.mp3");
        assert_eq!(failed.error().unwrap().kind(), "mux");
        let msg = failed.error().unwrap().to_string();
        assert!(msg.contains(&failed.video_path.display().to_string()));
        assert!(msg.contains(&failed.song_path.display().to_string()));
        assert!(!fx.output_dir.join("demo_bad_mp3.mp4").exists());
        assert!(fx.output_dir.join("demo_good_mp3.mp4").exists());
    }

    #[tokio::test]
    async fn probe_failure_releases_reserved_name() {
        let fx = fixture();
        let (dir, set) = uploads_in(&fx.upload_base, &["broken.mp4"], &["a.mp3"]).await;
        let backend = Arc::new(FakeBackend {
            duration: 30.0,
            probe_fails_for: Some("broken"),
            ..Default::default()
        });
        let batch = processor(backend, &fx.output_dir, ProcessingSettings::default());

        let report = batch
            .process("req", dir, &set, &metadata(), &CancellationToken::new())
            .await;

        let outcome = &report.outcomes[0];
        assert!(matches!(&outcome.status, PairStatus::Failed(MuxError::Probe(_))));
        assert!(outcome.error().unwrap().to_string().starts_with("Error getting video duration for"));
        assert!(!fx.output_dir.join("demo_a_mp3.mp4").exists());
    }

    #[tokio::test]
    async fn uploads_are_removed_on_success_and_failure() {
        for fails in [None, Some("a.mp3")] {
            let fx = fixture();
            let (dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3"]).await;
            let root = dir.root().to_path_buf();
            let stored: Vec<_> = set
                .videos
                .iter()
                .chain(&set.songs)
                .map(|f| f.temp_path.clone())
                .collect();
            let backend = Arc::new(FakeBackend {
                duration: 30.0,
                mux_fails_for: fails,
                ..Default::default()
            });
            let batch = processor(backend, &fx.output_dir, ProcessingSettings::default());

            let report = batch
                .process("req", dir, &set, &metadata(), &CancellationToken::new())
                .await;

            assert!(report.cleanup.is_clean());
            assert!(stored.iter().all(|p| !p.exists()));
            assert!(!root.exists());
        }
    }

    #[tokio::test]
    async fn offsets_stay_within_window() {
        let fx = fixture();
        let (_dir, set) =
            uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3", "b.mp3", "c.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(4.0));
        let batch = processor(backend.clone(), &fx.output_dir, ProcessingSettings::default());

        let outcomes = batch
            .run("req", &set, &metadata(), &CancellationToken::new())
            .await;

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            match outcome.status {
                PairStatus::Succeeded {
                    duration_secs,
                    offset_secs,
                    ..
                } => {
                    assert_eq!(duration_secs, 4.0);
                    assert!((0.0..4.0).contains(&offset_secs));
                }
                PairStatus::Failed(ref e) => panic!("unexpected failure: {}", e),
            }
        }
    }

    #[tokio::test]
    async fn seeded_offsets_are_reproducible() {
        let processing = ProcessingSettings {
            offset_seed: Some(99),
            collision_policy: CollisionPolicy::Overwrite,
            ..Default::default()
        };
        let mut runs = Vec::new();
        for _ in 0..2 {
            let fx = fixture();
            let (_dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3", "b.mp3"]).await;
            let backend = Arc::new(FakeBackend::with_duration(30.0));
            let batch = processor(backend.clone(), &fx.output_dir, processing.clone());
            batch.run("req", &set, &metadata(), &CancellationToken::new()).await;
            let mut offsets = backend.offsets.lock().clone();
            offsets.sort_by_key(|(i, _)| *i);
            runs.push(offsets);
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn pool_size_bounds_concurrency() {
        let fx = fixture();
        let (_dir, set) = uploads_in(
            &fx.upload_base,
            &["v1.mp4", "v2.mp4", "v3.mp4"],
            &["a.mp3", "b.mp3"],
        )
        .await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let processing = ProcessingSettings {
            max_parallel_jobs: 2,
            ..Default::default()
        };
        let batch = processor(backend.clone(), &fx.output_dir, processing);

        let outcomes = batch.run("req", &set, &metadata(), &CancellationToken::new()).await;

        assert_eq!(outcomes.len(), 6);
        let max = backend.max_in_flight.load(Ordering::SeqCst);
        assert!(max >= 1 && max <= 2, "max in flight was {}", max);
    }

    #[tokio::test]
    async fn cancelled_batch_fails_every_pair_without_outputs() {
        let fx = fixture();
        let (_dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3", "b.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let batch = processor(backend, &fx.output_dir, ProcessingSettings::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcomes = batch.run("req", &set, &metadata(), &cancel).await;

        assert!(outcomes.iter().all(|o| o.error().map(MuxError::kind) == Some("cancelled")));
        assert_eq!(std::fs::read_dir(&fx.output_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reject_policy_fails_only_colliding_pair() {
        let fx = fixture();
        std::fs::create_dir_all(&fx.output_dir).unwrap();
        std::fs::write(fx.output_dir.join("demo_a_mp3.mp4"), b"keep me").unwrap();
        let (_dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3", "b.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let processing = ProcessingSettings {
            collision_policy: CollisionPolicy::Reject,
            ..Default::default()
        };
        let batch = processor(backend, &fx.output_dir, processing);

        let outcomes = batch.run("req", &set, &metadata(), &CancellationToken::new()).await;

        assert_eq!(outcomes[0].error().map(MuxError::kind), Some("collision"));
        assert!(outcomes[1].is_success());
        assert_eq!(
            std::fs::read(fx.output_dir.join("demo_a_mp3.mp4")).unwrap(),
            b"keep me"
        );
    }

    #[tokio::test]
    async fn pair_logs_written_when_enabled() {
        let fx = fixture();
        let logs = fx.output_dir.parent().unwrap().join("logs");
        let (_dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let batch = processor(backend, &fx.output_dir, ProcessingSettings::default())
            .with_request_logs(&logs);

        batch.run("req42", &set, &metadata(), &CancellationToken::new()).await;

        let log = std::fs::read_to_string(logs.join("req42-pair-01.log")).unwrap();
        assert!(log.contains("v.mp4 + a.mp3"));
        assert!(log.contains("demo_a_mp3.mp4"));
        let summary = std::fs::read_to_string(logs.join("req42.log")).unwrap();
        assert!(summary.contains("All 1 pair(s) muxed"));
    }

    #[tokio::test]
    async fn overwrite_failure_keeps_earlier_output() {
        let fx = fixture();
        std::fs::create_dir_all(&fx.output_dir).unwrap();
        let earlier = fx.output_dir.join("demo_a_mp3.mp4");
        std::fs::write(&earlier, b"earlier request's output").unwrap();
        let (dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3"]).await;
        let backend = Arc::new(FakeBackend {
            duration: 30.0,
            mux_fails_for: Some("a.mp3"),
            ..Default::default()
        });
        let processing = ProcessingSettings {
            collision_policy: CollisionPolicy::Overwrite,
            ..Default::default()
        };
        let batch = processor(backend, &fx.output_dir, processing);

        let report = batch
            .process("req", dir, &set, &metadata(), &CancellationToken::new())
            .await;

        assert_eq!(report.outcomes[0].error().map(MuxError::kind), Some("mux"));
        assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier request's output");
        assert_eq!(std::fs::read_dir(&fx.output_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn overwrite_success_replaces_earlier_output() {
        let fx = fixture();
        std::fs::create_dir_all(&fx.output_dir).unwrap();
        let earlier = fx.output_dir.join("demo_a_mp3.mp4");
        std::fs::write(&earlier, b"earlier request's output").unwrap();
        let (_dir, set) = uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let processing = ProcessingSettings {
            collision_policy: CollisionPolicy::Overwrite,
            ..Default::default()
        };
        let batch = processor(backend, &fx.output_dir, processing);

        let outcomes = batch.run("req", &set, &metadata(), &CancellationToken::new()).await;

        assert_eq!(outcomes[0].output_path(), Some(earlier.as_path()));
        assert_eq!(std::fs::read(&earlier).unwrap(), b"muxed");
        assert_eq!(std::fs::read_dir(&fx.output_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn overwrite_gives_each_pair_of_a_batch_its_own_file() {
        let fx = fixture();
        let (_dir, set) = uploads_in(&fx.upload_base, &["v1.mp4", "v2.mp4"], &["a.mp3"]).await;
        let backend = Arc::new(FakeBackend::with_duration(30.0));
        let processing = ProcessingSettings {
            collision_policy: CollisionPolicy::Overwrite,
            max_parallel_jobs: 2,
            ..Default::default()
        };
        let batch = processor(backend, &fx.output_dir, processing);

        let outcomes = batch.run("req", &set, &metadata(), &CancellationToken::new()).await;

        let outputs: Vec<PathBuf> = outcomes
            .iter()
            .filter_map(PairOutcome::output_path)
            .map(Path::to_path_buf)
            .collect();
        assert_eq!(
            outputs,
            vec![
                fx.output_dir.join("demo_a_mp3.mp4"),
                fx.output_dir.join("demo_a_mp3_1.mp4"),
            ]
        );
        for path in outputs {
            assert_eq!(std::fs::read(path).unwrap(), b"muxed");
        }
    }

    #[tokio::test]
    async fn dropped_batch_releases_reserved_names() {
        let fx = fixture();
        let (dir, set) =
            uploads_in(&fx.upload_base, &["v.mp4"], &["a.mp3", "b.mp3", "c.mp3"]).await;
        let upload_root = dir.root().to_path_buf();
        let backend = Arc::new(FakeBackend {
            duration: 30.0,
            hangs: true,
            ..Default::default()
        });
        let batch = processor(backend.clone(), &fx.output_dir, ProcessingSettings::default());
        let cancel = CancellationToken::new();

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            batch.process("req", dir, &set, &metadata(), &cancel),
        )
        .await;

        assert!(result.is_err());
        assert!(!backend.offsets.lock().is_empty());
        let left: Vec<_> = std::fs::read_dir(&fx.output_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(left.is_empty(), "left behind: {:?}", left);
        assert!(crate::test_support::wait_until_gone(&upload_root).await);
    }
}
