//! Per-request upload directory and its removal.
//!
//! Uploads land in `<upload_dir>/<request-id>/`. The directory is removed
//! once the batch finishes, whatever the outcome; if the request future
//! is dropped first (client disconnect, shutdown), `Drop` removes it.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A file or directory that could not be removed.
#[derive(Error, Debug)]
#[error("failed to remove {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// What cleanup removed and what it could not.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: usize,
    pub failures: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, result: io::Result<()>) {
        match result {
            Ok(()) => self.removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => self.failures.push(CleanupError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Temporary directory holding one request's uploads.
#[derive(Debug)]
pub struct UploadDir {
    root: PathBuf,
    files: Vec<PathBuf>,
    cleaned: bool,
}

impl UploadDir {
    /// Create `<base>/<request_id>/`.
    pub async fn create(base: &Path, request_id: &str) -> io::Result<Self> {
        let root = base.join(request_id);
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            files: Vec::new(),
            cleaned: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a new file inside the directory.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Remember a stored file so cleanup removes it.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    /// Remove every tracked file, then the directory itself.
    pub async fn cleanup(mut self) -> CleanupReport {
        self.cleaned = true;
        let mut report = CleanupReport::default();

        for file in &self.files {
            report.record(file, tokio::fs::remove_file(file).await);
        }
        report.record(&self.root, tokio::fs::remove_dir(&self.root).await);

        for failure in &report.failures {
            tracing::warn!("Upload cleanup: {}", failure);
        }
        report
    }
}

impl Drop for UploadDir {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        tracing::debug!("Removing abandoned upload dir {}", self.root.display());
        let root = std::mem::take(&mut self.root);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_abandoned(&root));
            }
            Err(_) => remove_abandoned(&root),
        }
    }
}

fn remove_abandoned(root: &Path) {
    if let Err(e) = std::fs::remove_dir_all(root) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove upload dir {}: {}", root.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::wait_until_gone;
    use tempfile::tempdir;

    #[tokio::test]
    async fn cleanup_removes_files_and_dir() {
        let base = tempdir().unwrap();
        let mut dir = UploadDir::create(base.path(), "req-1").await.unwrap();
        let file = dir.file_path("a.mp4");
        std::fs::write(&file, b"x").unwrap();
        dir.track(&file);
        let root = dir.root().to_path_buf();

        let report = dir.cleanup().await;

        assert!(report.is_clean());
        assert_eq!(report.removed, 2);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn already_missing_files_are_not_failures() {
        let base = tempdir().unwrap();
        let mut dir = UploadDir::create(base.path(), "req-2").await.unwrap();
        dir.track(dir.file_path("never-written.mp3"));

        let report = dir.cleanup().await;
        assert!(report.is_clean());
        assert_eq!(report.removed, 1);
    }

    #[tokio::test]
    async fn failures_are_reported_per_path() {
        let base = tempdir().unwrap();
        let mut dir = UploadDir::create(base.path(), "req-3").await.unwrap();
        // A directory cannot be removed with remove_file
        let stubborn = dir.file_path("stubborn");
        std::fs::create_dir(&stubborn).unwrap();
        dir.track(&stubborn);

        let report = dir.cleanup().await;

        assert!(!report.is_clean());
        assert_eq!(report.failures[0].path, stubborn);
        assert!(report.failures[0].to_string().contains("stubborn"));
    }

    #[tokio::test]
    async fn drop_removes_uncleaned_dir() {
        let base = tempdir().unwrap();
        let root = {
            let dir = UploadDir::create(base.path(), "req-4").await.unwrap();
            std::fs::write(dir.file_path("partial.mp4"), b"x").unwrap();
            dir.root().to_path_buf()
        };
        assert!(wait_until_gone(&root).await);
    }

    #[test]
    fn drop_outside_runtime_removes_synchronously() {
        let base = tempdir().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = runtime
            .block_on(UploadDir::create(base.path(), "req-5"))
            .unwrap();
        std::fs::write(dir.file_path("partial.mp4"), b"x").unwrap();
        let root = dir.root().to_path_buf();

        drop(dir);
        assert!(!root.exists());
    }
}
