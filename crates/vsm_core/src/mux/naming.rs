//! Output file naming and reservation.
//!
//! Names are derived from the request title and the song's original file
//! name: both are sanitized to `[a-z0-9_]`, cut to 20 characters and joined
//! as `{title}_{song}.mp4`.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::CollisionPolicy;

use super::errors::MuxError;

/// Characters kept from each name part.
pub const NAME_PART_LIMIT: usize = 20;

/// Give up looking for a free suffix after this many attempts.
const MAX_SUFFIX_ATTEMPTS: usize = 10_000;

/// Replace every character outside `[A-Za-z0-9]` with `_` and lower-case.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn truncated(name: &str) -> String {
    sanitize_file_name(name).chars().take(NAME_PART_LIMIT).collect()
}

/// `{title}_{song}.mp4` with both parts sanitized and truncated.
pub fn output_file_name(title: &str, song_name: &str) -> String {
    format!("{}_{}.mp4", truncated(title), truncated(song_name))
}

/// Join the output file name onto the output directory.
pub fn output_path(title: &str, song_name: &str, output_dir: &Path) -> PathBuf {
    output_dir.join(output_file_name(title, song_name))
}

/// `name.mp4` -> `name_{n}.mp4`.
fn suffixed(base: &Path, n: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    base.with_file_name(file_name)
}

/// `name.mp4` -> `name.part-{token}.mp4`. Keeps the extension so ffmpeg
/// still picks the mp4 muxer.
fn staging_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let token: u32 = rand::random();
    let file_name = match path.extension() {
        Some(ext) => format!("{}.part-{:08x}.{}", stem, token, ext.to_string_lossy()),
        None => format!("{}.part-{:08x}", stem, token),
    };
    path.with_file_name(file_name)
}

/// A claimed output path.
///
/// The tool writes to `staging_path()`; `commit` renames that onto
/// `path()`. A reservation that is released or dropped without a commit
/// removes its staging file and its placeholder, and never touches a file
/// it did not create.
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    staging: PathBuf,
    placeholder: bool,
    settled: bool,
}

impl Reservation {
    fn new(path: PathBuf, placeholder: bool) -> Self {
        Self {
            staging: staging_for(&path),
            path,
            placeholder,
            settled: false,
        }
    }

    /// Final output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the tool writes until the output is complete.
    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    /// Move the finished staging file over the final path.
    pub async fn commit(mut self) -> io::Result<()> {
        tokio::fs::rename(&self.staging, &self.path).await?;
        self.settled = true;
        Ok(())
    }

    /// Give the name back: remove the staging file and the placeholder.
    pub async fn release(mut self) {
        self.settled = true;
        remove_quietly(&self.staging, tokio::fs::remove_file(&self.staging).await);
        if self.placeholder {
            remove_quietly(&self.path, tokio::fs::remove_file(&self.path).await);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        remove_quietly(&self.staging, std::fs::remove_file(&self.staging));
        if self.placeholder {
            tracing::debug!("Releasing abandoned output name {}", self.path.display());
            remove_quietly(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

fn remove_quietly(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!("Removed incomplete output {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove incomplete output {}: {}", path.display(), e),
    }
}

/// Resolves output paths for one batch under a collision policy.
///
/// Paths handed out earlier in the same batch always count as taken, so
/// no two pairs of a batch share an output. On disk, `unique_suffix` and
/// `reject` claim names with `create_new`, so concurrent requests never
/// get the same path; `overwrite` only replaces files from earlier
/// requests.
#[derive(Debug)]
pub struct OutputReserver {
    policy: CollisionPolicy,
    taken: HashSet<PathBuf>,
}

impl OutputReserver {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            taken: HashSet::new(),
        }
    }

    /// Resolve `base` into a usable output path.
    pub fn reserve(&mut self, base: PathBuf) -> Result<Reservation, MuxError> {
        match self.policy {
            CollisionPolicy::Reject => {
                if self.taken.contains(&base) {
                    return Err(MuxError::collision(base));
                }
                match claim(&base) {
                    Ok(true) => Ok(self.take(base, true)),
                    Ok(false) => Err(MuxError::collision(base)),
                    Err(e) => Err(MuxError::io("reserving output file", e)),
                }
            }
            CollisionPolicy::Overwrite | CollisionPolicy::UniqueSuffix => {
                let on_disk = self.policy == CollisionPolicy::UniqueSuffix;
                for n in 0..MAX_SUFFIX_ATTEMPTS {
                    let candidate = if n == 0 { base.clone() } else { suffixed(&base, n) };
                    if self.taken.contains(&candidate) {
                        continue;
                    }
                    if !on_disk {
                        return Ok(self.take(candidate, false));
                    }
                    match claim(&candidate) {
                        Ok(true) => return Ok(self.take(candidate, true)),
                        Ok(false) => continue,
                        Err(e) => return Err(MuxError::io("reserving output file", e)),
                    }
                }
                Err(MuxError::collision(base))
            }
        }
    }

    fn take(&mut self, path: PathBuf, placeholder: bool) -> Reservation {
        self.taken.insert(path.clone());
        Reservation::new(path, placeholder)
    }
}

/// Atomically create an empty file at `path`. Ok(false) if it already exists.
fn claim(path: &Path) -> io::Result<bool> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}
