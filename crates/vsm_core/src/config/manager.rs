//! Loading and writing `settings.toml`.
//!
//! The service only reads its config, but a missing file is created with
//! defaults and a file missing keys (or carrying unknown sections) is
//! rewritten, so the on-disk file always documents every setting.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::DocumentMut;

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the config file path and the settings read from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Starts with defaults; nothing is read until `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    /// Read the file, writing defaults when it is absent and rewriting it
    /// when it is incomplete.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        let text = match fs::read_to_string(&self.config_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("Creating default config at {}", self.config_path.display());
                self.settings = Settings::default();
                return self.save();
            }
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = toml::from_str(&text)?;
        let doc: DocumentMut = text.parse()?;
        let stale = needs_rewrite(&doc, &settings)?;
        self.settings = settings;

        if stale {
            tracing::info!("Filling in missing settings in {}", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Create the upload, output and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [paths.upload_dir(), paths.output_dir(), paths.logs_dir()] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        self.settings.paths.logs_dir()
    }

    /// Write every section, with its comment, replacing the file.
    pub fn save(&self) -> ConfigResult<()> {
        let text = render(&self.settings)?;
        write_atomically(&self.config_path, &text)?;
        Ok(())
    }
}

/// True if the file has a section we do not know or lacks a key we write.
fn needs_rewrite(doc: &DocumentMut, settings: &Settings) -> ConfigResult<bool> {
    let known = |name: &str| ConfigSection::ALL.iter().any(|s| s.table_name() == name);
    if doc.iter().any(|(name, _)| !known(name)) {
        return Ok(true);
    }

    for section in ConfigSection::ALL {
        let Some(on_disk) = doc.get(section.table_name()).and_then(|item| item.as_table()) else {
            return Ok(true);
        };
        let expected = section_value(settings, section)?;
        let keys = expected.as_table().into_iter().flat_map(|t| t.keys());
        if keys.into_iter().any(|key| !on_disk.contains_key(key)) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn section_value(settings: &Settings, section: ConfigSection) -> ConfigResult<toml::Value> {
    let value = match section {
        ConfigSection::Server => toml::Value::try_from(&settings.server)?,
        ConfigSection::Paths => toml::Value::try_from(&settings.paths)?,
        ConfigSection::Tools => toml::Value::try_from(&settings.tools)?,
        ConfigSection::Processing => toml::Value::try_from(&settings.processing)?,
        ConfigSection::Logging => toml::Value::try_from(&settings.logging)?,
    };
    Ok(value)
}

fn render(settings: &Settings) -> ConfigResult<String> {
    let mut text = String::from("# Video Song Muxer settings\n");
    text.push_str("# Missing keys are filled in with defaults on startup.\n");

    for section in ConfigSection::ALL {
        let body = match section {
            ConfigSection::Server => toml::to_string_pretty(&settings.server)?,
            ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
            ConfigSection::Tools => toml::to_string_pretty(&settings.tools)?,
            ConfigSection::Processing => toml::to_string_pretty(&settings.processing)?,
            ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
        };
        text.push_str(&format!("\n# {}\n[{}]\n{}", section.comment(), section.table_name(), body));
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}

/// Write to a hidden sibling, sync, then rename over `path`.
fn write_atomically(path: &Path, text: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "settings.toml".to_string());
    let staging = dir.join(format!(".{}.tmp", name));

    let mut file = fs::File::create(&staging)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&staging, path)
}
