//! Uploaded media files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::FieldGroup;

/// A transient upload stored in the request's temp directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// File name as sent by the client.
    pub original_name: String,
    /// Where the bytes were stored.
    pub temp_path: PathBuf,
    /// Which form group the file came from.
    pub group: FieldGroup,
    /// Stored size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl UploadedFile {
    pub fn new(
        original_name: impl Into<String>,
        temp_path: impl Into<PathBuf>,
        group: FieldGroup,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            temp_path: temp_path.into(),
            group,
            size: 0,
        }
    }

    /// Set the stored size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }
}

/// Files of one request, split by group in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSet {
    pub videos: Vec<UploadedFile>,
    pub songs: Vec<UploadedFile>,
}

impl UploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the list matching its group.
    pub fn push(&mut self, file: UploadedFile) {
        match file.group {
            FieldGroup::Video => self.videos.push(file),
            FieldGroup::Song => self.songs.push(file),
        }
    }

    /// Groups that have no files.
    pub fn missing_groups(&self) -> Vec<FieldGroup> {
        let mut missing = Vec::new();
        if self.videos.is_empty() {
            missing.push(FieldGroup::Video);
        }
        if self.songs.is_empty() {
            missing.push(FieldGroup::Song);
        }
        missing
    }

    /// Number of (video, song) pairs this set produces.
    pub fn pair_count(&self) -> usize {
        self.videos.len() * self.songs.len()
    }
}
