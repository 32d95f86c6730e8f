//! ffmpeg command options builder.
//!
//! Builds command-line tokens for a single video + song mux:
//!
//! - Input 0 is the video; its video stream is copied untouched
//! - Input 1 is the song, seeked to the start offset; its audio is
//!   re-encoded to AAC
//! - `-shortest` stops at the end of the shorter mapped stream
//! - Four metadata tags are written into the output container

use std::path::Path;

use crate::models::Metadata;

/// Builder for ffmpeg command-line options.
///
/// Generates a list of string tokens that form a complete ffmpeg command
/// (without the program name).
pub struct FfmpegOptionsBuilder<'a> {
    video: &'a Path,
    song: &'a Path,
    output_path: &'a Path,
    offset_secs: f64,
    metadata: &'a Metadata,
}

impl<'a> FfmpegOptionsBuilder<'a> {
    pub fn new(
        video: &'a Path,
        song: &'a Path,
        output_path: &'a Path,
        offset_secs: f64,
        metadata: &'a Metadata,
    ) -> Self {
        Self {
            video,
            song,
            output_path,
            offset_secs,
            metadata,
        }
    }

    /// Build the complete ffmpeg command tokens.
    pub fn build(&self) -> Vec<String> {
        let mut tokens = Vec::new();

        // Output path may be a reservation placeholder, so always overwrite
        tokens.push("-y".to_string());
        tokens.push("-v".to_string());
        tokens.push("error".to_string());

        self.add_inputs(&mut tokens);

        tokens.push("-shortest".to_string());

        self.add_stream_mapping(&mut tokens);
        self.add_metadata(&mut tokens);

        tokens.push(self.output_path.to_string_lossy().to_string());

        tokens
    }

    /// Video first, then the song with its input seek.
    fn add_inputs(&self, tokens: &mut Vec<String>) {
        tokens.push("-i".to_string());
        tokens.push(self.video.to_string_lossy().to_string());

        // -ss before -i applies to that input only
        tokens.push("-ss".to_string());
        tokens.push(format_offset(self.offset_secs));
        tokens.push("-i".to_string());
        tokens.push(self.song.to_string_lossy().to_string());
    }

    fn add_stream_mapping(&self, tokens: &mut Vec<String>) {
        tokens.extend(
            ["-map", "0:v", "-map", "1:a", "-c:v", "copy", "-c:a", "aac"]
                .iter()
                .map(|s| s.to_string()),
        );
    }

    fn add_metadata(&self, tokens: &mut Vec<String>) {
        for (key, value) in self.metadata.tags() {
            tokens.push("-metadata".to_string());
            tokens.push(format!("{}={}", key, value));
        }
    }
}

/// Seconds with millisecond precision, as ffmpeg accepts for `-ss`.
pub fn format_offset(offset_secs: f64) -> String {
    // Truncate, never round up past the drawn window
    let millis = (offset_secs.max(0.0) * 1000.0).floor() as u64;
    format!("{}.{:03}", millis / 1000, millis % 1000)
}

/// Format tokens in a readable multi-line format.
///
/// Groups option/value pairs on the same line.
pub fn format_tokens_pretty(tokens: &[String]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if token.starts_with('-') && i + 1 < tokens.len() && !tokens[i + 1].starts_with('-') {
            result.push_str(&format!("{} {} \\\n", token, tokens[i + 1]));
            i += 2;
        } else {
            result.push_str(&format!("{} \\\n", token));
            i += 1;
        }
    }

    result
}
