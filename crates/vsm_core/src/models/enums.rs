//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Which multipart file group an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldGroup {
    Video,
    Song,
}

impl FieldGroup {
    /// Multipart form field name carrying this group.
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldGroup::Video => "videos",
            FieldGroup::Song => "songs",
        }
    }

    /// Map a multipart field name back to its group.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "videos" => Some(FieldGroup::Video),
            "songs" => Some(FieldGroup::Song),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldGroup::Video => write!(f, "video"),
            FieldGroup::Song => write!(f, "song"),
        }
    }
}

/// Policy applied when a computed output name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Replace whatever is at the path.
    Overwrite,
    /// Append `_1`, `_2`, ... until a free name is found.
    #[default]
    UniqueSuffix,
    /// Fail the pair.
    Reject,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::UniqueSuffix => write!(f, "unique_suffix"),
            CollisionPolicy::Reject => write!(f, "reject"),
        }
    }
}
