//! Job-related data structures (metadata, per-pair jobs).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::media::UploadedFile;

/// Container metadata applied to every output of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub keywords: String,
}

impl Metadata {
    /// Form field names, in tag order.
    pub const FIELDS: [&'static str; 4] = ["title", "description", "author", "keywords"];

    pub fn is_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    /// Set a field by its form name. Returns false for unknown names.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        match name {
            "title" => self.title = value,
            "description" => self.description = value,
            "author" => self.author = value,
            "keywords" => self.keywords = value,
            _ => return false,
        }
        true
    }

    /// `(key, value)` pairs in the order they are written to the container.
    pub fn tags(&self) -> [(&'static str, &str); 4] {
        [
            ("title", self.title.as_str()),
            ("description", self.description.as_str()),
            ("author", self.author.as_str()),
            ("keywords", self.keywords.as_str()),
        ]
    }
}

/// One (video, song) pairing with its resolved output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxJob {
    /// Position in video-major, song-minor order.
    pub index: usize,
    pub video: UploadedFile,
    pub song: UploadedFile,
    pub output_path: PathBuf,
    /// Temporary file the tool writes before it is moved to `output_path`.
    pub staging_path: Option<PathBuf>,
}

impl MuxJob {
    pub fn new(index: usize, video: UploadedFile, song: UploadedFile, output_path: PathBuf) -> Self {
        Self {
            index,
            video,
            song,
            output_path,
            staging_path: None,
        }
    }

    pub fn with_staging(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_path = Some(path.into());
        self
    }

    /// File the mux tool should write.
    pub fn write_path(&self) -> &Path {
        self.staging_path.as_deref().unwrap_or(&self.output_path)
    }

    /// Short label for logs: `video.mp4 + song.mp3`.
    pub fn label(&self) -> String {
        format!("{} + {}", self.video.original_name, self.song.original_name)
    }
}
