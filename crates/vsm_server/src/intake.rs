//! Multipart intake: stream uploaded files to the request's upload dir.

use std::io;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use vsm_core::models::{FieldGroup, Metadata, UploadSet, UploadedFile};
use vsm_core::orchestrator::UploadDir;

/// Longest extension kept from the client's file name.
const MAX_EXTENSION_LEN: usize = 10;

/// Why an upload could not be accepted.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// One or both file groups are empty.
    #[error("No files uploaded. Missing: {}", names(.0))]
    MissingGroups(Vec<FieldGroup>),

    /// The body is not valid multipart (or exceeded the size limit).
    #[error("Malformed upload: {}", .0.body_text())]
    Malformed(#[from] MultipartError),

    /// Writing an uploaded file failed.
    #[error("Failed to store upload '{name}': {source}")]
    Storage {
        name: String,
        #[source]
        source: io::Error,
    },
}

fn names(groups: &[FieldGroup]) -> String {
    groups
        .iter()
        .map(FieldGroup::field_name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::MissingGroups(_) => StatusCode::BAD_REQUEST,
            IntakeError::Malformed(e) => e.status(),
            IntakeError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn storage(name: &str, source: io::Error) -> Self {
        Self::Storage {
            name: name.to_string(),
            source,
        }
    }
}

/// Files and form fields of one accepted upload.
#[derive(Debug, Default)]
pub struct Intake {
    pub uploads: UploadSet,
    pub metadata: Metadata,
}

/// Read the whole form, storing file parts under `dir`.
///
/// Every stored file is tracked on `dir`, including ones written before
/// an error, so the caller's cleanup covers them.
pub async fn receive(multipart: &mut Multipart, dir: &mut UploadDir) -> Result<Intake, IntakeError> {
    let mut intake = Intake::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(group) = FieldGroup::from_field_name(&name) {
            if let Some(file) = store_file(field, group, dir).await? {
                tracing::debug!(
                    "Stored {} '{}' ({} bytes) at {}",
                    group,
                    file.original_name,
                    file.size,
                    file.temp_path.display()
                );
                intake.uploads.push(file);
            }
            continue;
        }

        if Metadata::is_field(&name) {
            let value = field.text().await?;
            intake.metadata.set_field(&name, value);
        } else {
            tracing::debug!("Ignoring unknown form field '{}'", name);
        }
    }

    let missing = intake.uploads.missing_groups();
    if !missing.is_empty() {
        return Err(IntakeError::MissingGroups(missing));
    }
    Ok(intake)
}

/// Stream one file part to disk. Returns None for an empty
/// "no file chosen" part.
async fn store_file(
    mut field: Field<'_>,
    group: FieldGroup,
    dir: &mut UploadDir,
) -> Result<Option<UploadedFile>, IntakeError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let path = dir.file_path(&stored_name(&original_name));
    dir.track(&path);

    let mut file = File::create(&path)
        .await
        .map_err(|e| IntakeError::storage(&original_name, e))?;
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| IntakeError::storage(&original_name, e))?;
        size += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| IntakeError::storage(&original_name, e))?;
    drop(file);

    if original_name.is_empty() && size == 0 {
        // Left for the upload dir cleanup
        return Ok(None);
    }

    Ok(Some(
        UploadedFile::new(original_name, path, group).with_size(size),
    ))
}

/// Unique on-disk name keeping the (sanitized) original extension.
fn stored_name(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match extension(original_name) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

fn extension(original_name: &str) -> Option<String> {
    let (stem, ext) = original_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    ext.chars()
        .all(|c| c.is_ascii_alphanumeric())
        .then(|| ext.to_ascii_lowercase())
}
