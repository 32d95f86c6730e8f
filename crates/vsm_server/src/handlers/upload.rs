//! `POST /upload`: accept videos and songs, mux every pair.

use std::fmt::Write as _;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use uuid::Uuid;

use vsm_core::orchestrator::{BatchReport, CleanupReport, UploadDir};

use crate::app::AppState;
use crate::error::AppError;
use crate::intake;

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, String), AppError> {
    let request_id = Uuid::new_v4().to_string();
    let mut dir = UploadDir::create(&state.settings.paths.upload_dir(), &request_id)
        .await
        .map_err(AppError::UploadDir)?;
    tracing::debug!("Request {}: storing uploads in {}", request_id, dir.root().display());

    let intake = match intake::receive(&mut multipart, &mut dir).await {
        Ok(intake) => intake,
        Err(e) => {
            let cleanup = dir.cleanup().await;
            tracing::debug!(
                "Request {} rejected, removed {} upload path(s)",
                request_id,
                cleanup.removed
            );
            return Err(e.into());
        }
    };

    tracing::info!(
        "Request {}: {} video(s), {} song(s), title '{}'",
        request_id,
        intake.uploads.videos.len(),
        intake.uploads.songs.len(),
        intake.metadata.title
    );

    let cancel = state.shutdown.child_token();
    let report = state
        .processor
        .process(&request_id, dir, &intake.uploads, &intake.metadata, &cancel)
        .await;

    Ok(render(&report))
}

/// Status and plain-text body for a finished batch.
fn render(report: &BatchReport) -> (StatusCode, String) {
    let mut body = String::new();

    let status = if report.all_succeeded() {
        let _ = writeln!(body, "Files processed successfully!");
        let _ = writeln!(body, "{} output file(s):", report.succeeded_count());
        for output in report.outputs() {
            let _ = writeln!(body, "  {}", output.display());
        }
        tracing::info!("Request {}: all pairs succeeded", report.request_id);
        StatusCode::OK
    } else {
        let _ = writeln!(body, "Error processing files.");
        let _ = writeln!(
            body,
            "{} of {} pair(s) failed:",
            report.outcomes.len() - report.succeeded_count(),
            report.outcomes.len()
        );
        for outcome in &report.outcomes {
            let _ = writeln!(body, "  {}", outcome.summary());
        }
        tracing::error!(
            "Request {}: {} pair(s) failed",
            report.request_id,
            report.failures().count()
        );
        StatusCode::INTERNAL_SERVER_ERROR
    };

    append_cleanup(&mut body, &report.cleanup);
    (status, body)
}

fn append_cleanup(body: &mut String, cleanup: &CleanupReport) {
    if cleanup.is_clean() {
        return;
    }
    let _ = writeln!(body, "Cleanup warnings:");
    for failure in &cleanup.failures {
        let _ = writeln!(body, "  {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use vsm_core::io::ToolError;
    use vsm_core::models::{FieldGroup, MuxJob, UploadedFile};
    use vsm_core::mux::MuxError;
    use vsm_core::orchestrator::{CleanupError, PairOutcome};

    fn job(index: usize, song: &str) -> MuxJob {
        MuxJob::new(
            index,
            UploadedFile::new("clip.mp4", "/up/r/v.mp4", FieldGroup::Video),
            UploadedFile::new(song, format!("/up/r/{}", song), FieldGroup::Song),
            PathBuf::from(format!("/out/demo_{}.mp4", index)),
        )
    }

    #[test]
    fn success_lists_outputs() {
        let report = BatchReport {
            request_id: "r".into(),
            outcomes: vec![
                PairOutcome::succeeded(&job(0, "a.mp3"), 30.0, 1.0),
                PairOutcome::succeeded(&job(1, "b.mp3"), 30.0, 2.0),
            ],
            cleanup: CleanupReport::default(),
        };
        let (status, body) = render(&report);
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("Files processed successfully!"));
        assert!(body.contains("2 output file(s)"));
        assert!(body.contains("/out/demo_1.mp4"));
        assert!(!body.contains("Cleanup"));
    }

    #[test]
    fn failure_names_inputs_and_class() {
        let failed = job(1, "b.mp3");
        let report = BatchReport {
            request_id: "r".into(),
            outcomes: vec![
                PairOutcome::succeeded(&job(0, "a.mp3"), 30.0, 1.0),
                PairOutcome::failed(
                    &failed,
                    MuxError::tool(
                        failed.video.path(),
                        failed.song.path(),
                        ToolError::failed("ffmpeg", 1, "Conversion failed!"),
                    ),
                ),
            ],
            cleanup: CleanupReport::default(),
        };
        let (status, body) = render(&report);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("1 of 2 pair(s) failed"));
        assert!(body.contains("[mux]"));
        assert!(body.contains("/up/r/v.mp4"));
        assert!(body.contains("/up/r/b.mp3"));
        // Successful outputs still listed
        assert!(body.contains("/out/demo_0.mp4"));
    }

    #[test]
    fn cleanup_failures_do_not_change_status() {
        let report = BatchReport {
            request_id: "r".into(),
            outcomes: vec![PairOutcome::succeeded(&job(0, "a.mp3"), 30.0, 1.0)],
            cleanup: CleanupReport {
                removed: 1,
                failures: vec![CleanupError {
                    path: Path::new("/up/r/a.mp3").to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                }],
            },
        };
        let (status, body) = render(&report);
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Cleanup warnings:"));
        assert!(body.contains("/up/r/a.mp3"));
    }
}
