//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::CollisionPolicy;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool settings.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Batch processing settings.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Sections of the config file, for section-level updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Server,
    Paths,
    Tools,
    Processing,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Server,
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Processing,
        ConfigSection::Logging,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Server => "server",
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Processing => "processing",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in a generated file.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Server => "HTTP listener",
            ConfigSection::Paths => "Upload, output and log directories",
            ConfigSection::Tools => "External media tools",
            ConfigSection::Processing => "Mux batch behaviour",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for a whole upload request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    2 * 1024 * 1024 * 1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerSettings {
    /// Socket address built from host and port.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Path configuration for uploads, outputs and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder for per-request upload directories.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Output folder for muxed files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_upload_dir() -> String {
    ".uploads".to_string()
}

fn default_output_folder() -> String {
    "outputs".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

impl PathSettings {
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_folder)
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.logs_folder)
    }
}

/// External tool locations and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name in PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable (name in PATH or absolute path).
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Seconds before a probe is killed.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Seconds before a mux is killed.
    #[serde(default = "default_mux_timeout")]
    pub mux_timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_mux_timeout() -> u64 {
    600
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            probe_timeout_secs: default_probe_timeout(),
            mux_timeout_secs: default_mux_timeout(),
        }
    }
}

impl ToolSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn mux_timeout(&self) -> Duration {
        Duration::from_secs(self.mux_timeout_secs)
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Upper bound of the random audio start offset, in seconds.
    #[serde(default = "default_max_offset")]
    pub max_offset_secs: f64,

    /// Duration assumed when the probe reports none.
    #[serde(default = "default_fallback_duration")]
    pub fallback_duration_secs: f64,

    /// Number of pairs muxed at the same time within one request.
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,

    /// What to do when an output name is already taken.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// Seed for reproducible offsets (pair `i` uses `seed + i`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_seed: Option<u64>,
}

fn default_max_offset() -> f64 {
    10.0
}

fn default_fallback_duration() -> f64 {
    5.0
}

fn default_max_parallel_jobs() -> usize {
    2
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            max_offset_secs: default_max_offset(),
            fallback_duration_secs: default_fallback_duration(),
            max_parallel_jobs: default_max_parallel_jobs(),
            collision_policy: CollisionPolicy::default(),
            offset_seed: None,
        }
    }
}

impl ProcessingSettings {
    /// Pool size, never below one.
    pub fn parallelism(&self) -> usize {
        self.max_parallel_jobs.max(1)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when RUST_LOG is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Write a log file per upload request.
    #[serde(default = "default_true")]
    pub request_logs: bool,

    /// Keep tool output out of request logs unless a tool fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            request_logs: true,
            compact: true,
            error_tail: default_error_tail(),
        }
    }
}
