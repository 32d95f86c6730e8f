//! VSM Core - Backend logic for Video Song Muxer
//!
//! This crate contains the muxing logic with no HTTP dependencies:
//! configuration, logging, ffprobe/ffmpeg integration and the batch
//! processor. The server crate wires it to HTTP routes.

pub mod config;
pub mod io;
pub mod logging;
pub mod models;
pub mod mux;
pub mod orchestrator;
pub mod probe;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
