//! Persistent playout settings.

use clap::ValueEnum;
use directories::ProjectDirs;
use playout_core::{Error, Result, StreamUsage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SETTINGS_FILE: &str = "settings.json";

/// Where rendered PCM goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The system audio output via cpal.
    #[default]
    Device,
    /// A WAV file via hound.
    Wav,
}

/// Settings read from `settings.json` in the config directory.
///
/// Every field is optional in the file; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayoutSettings {
    pub sample_rate: i32,
    pub channels: i32,
    /// Integer stream-type hint, 3 for music.
    pub stream_type: i32,
    pub backend: BackendKind,
    /// Output device name; the default device when unset.
    pub device_name: Option<String>,
    /// Capture file for the WAV backend.
    pub wav_path: Option<PathBuf>,
    /// Pace WAV capture to real time.
    pub paced: bool,
    /// Copy the asset into the data directory before playing it.
    pub copy_asset: bool,
}

impl Default for PlayoutSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            stream_type: StreamUsage::STREAM_MUSIC,
            backend: BackendKind::Device,
            device_name: None,
            wav_path: None,
            paced: true,
            copy_asset: true,
        }
    }
}

impl PlayoutSettings {
    /// Load from the platform config directory, falling back to defaults.
    pub fn load() -> Result<Self> {
        match project_dirs() {
            Some(dirs) => Self::load_from(&dirs.config_dir().join(SETTINGS_FILE)),
            None => {
                debug!("No config directory on this platform, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`. A missing file yields the defaults; a malformed one
    /// is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write the settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Path of the settings file in the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .ok_or_else(|| Error::InvalidConfig("Failed to determine config directory".to_string()))
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "soundvision", "Playout")
}
