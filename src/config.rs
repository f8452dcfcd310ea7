//! taskcap configuration.
//!
//! Loaded from `~/.taskcap/config.toml`. Every key is optional; a missing
//! file means all defaults. `TASKCAP_DATA_DIR` overrides `data-dir`.

use std::{env, fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

/// taskcap configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Where the task log and recordings live. Defaults to `~/.taskcap`.
    pub data_dir: Option<PathBuf>,

    /// Recorder to run for audio capture, e.g. `["arecord", "-q", "-f", "cd"]`.
    /// The target path is appended. Without one, recordings are empty files.
    pub record_command: Option<Vec<String>>,

    /// Player for reviewing a recording, e.g. `["aplay", "-q"]`.
    pub play_command: Option<Vec<String>>,

    /// Keep recordings rejected for being too short or too long.
    pub keep_rejected: bool,

    /// Readings at or above this level fail the noise check.
    pub noise_threshold_db: Option<u32>,
}

impl Config {
    pub const DEFAULT_NOISE_THRESHOLD_DB: u32 = 40;

    /// Load config from `~/.taskcap/config.toml`, falling back to defaults
    /// when the file doesn't exist.
    pub fn load() -> Result<Self, String> {
        let mut config = match Self::path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        if let Ok(dir) = env::var("TASKCAP_DATA_DIR")
            && !dir.is_empty()
        {
            config.data_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    fn load_from(path: &std::path::Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.taskcap/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".taskcap").join("config.toml"))
    }

    /// The data directory: configured, or `~/.taskcap`.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".taskcap")))
    }

    pub fn noise_threshold_db(&self) -> u32 {
        self.noise_threshold_db
            .unwrap_or(Self::DEFAULT_NOISE_THRESHOLD_DB)
    }
}
