//! Muxing module for ffmpeg integration.
//!
//! This module handles everything needed to turn one (video, song) pair
//! into an output file.
//!
//! # Architecture
//!
//! - **naming**: Derives `{title}_{song}.mp4` names and reserves them on disk
//! - **offset**: Picks the random audio start offset
//! - **options_builder**: Converts a pair into ffmpeg command tokens
//! - **backend**: `MediaBackend` trait and the ffprobe/ffmpeg implementation

mod backend;
mod errors;
pub mod naming;
mod offset;
mod options_builder;

pub use backend::{FfmpegBackend, MediaBackend};
pub use errors::MuxError;
pub use naming::{output_file_name, output_path, sanitize_file_name, OutputReserver, Reservation};
pub use offset::{random_offset, OffsetSource};
pub use options_builder::{format_offset, format_tokens_pretty, FfmpegOptionsBuilder};
