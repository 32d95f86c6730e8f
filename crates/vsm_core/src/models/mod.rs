//! Data models for Video Song Muxer.
//!
//! This module contains the core data structures shared by the crates:
//! - Enums for upload groups and the output collision policy
//! - Uploaded files and the per-request upload set
//! - Metadata and per-pair mux jobs

mod enums;
mod jobs;
mod media;

pub use enums::{CollisionPolicy, FieldGroup};
pub use jobs::{Metadata, MuxJob};
pub use media::{UploadSet, UploadedFile};
