//! Media probing with ffprobe.
//!
//! Only the container duration is needed: it bounds the random audio
//! start offset used when muxing.

mod duration;

pub use duration::{parse_duration, DurationProbe, ProbeError, ProbeResult};
