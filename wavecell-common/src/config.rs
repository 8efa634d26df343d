//! Configuration loading
//!
//! Settings resolution follows a fixed priority order:
//! 1. Explicit path (command-line argument, highest priority)
//! 2. `WAVECELL_CONFIG` environment variable
//! 3. `<config_dir>/wavecell/config.toml` if present
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is only an error when the path was given
//! explicitly; otherwise the defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming a config file to load
pub const CONFIG_ENV_VAR: &str = "WAVECELL_CONFIG";

/// Service-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding uploaded audio files and the index document
    pub storage_dir: PathBuf,

    /// Index document filename, relative to `storage_dir`
    pub index_filename: String,

    /// Default per-session sample buffer capacity, in samples
    pub default_buffer_size: usize,

    /// Default sample rate in Hz
    pub default_sample_rate: u32,

    /// Maximum number of entries in the asset lookup cache
    pub cache_capacity: usize,

    /// Hard ceiling on search result counts
    pub max_search_results: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("uploads"),
            index_filename: "audio_index.json".to_string(),
            default_buffer_size: 44_100,
            default_sample_rate: 44_100,
            cache_capacity: 1000,
            max_search_results: 1000,
        }
    }
}

impl Settings {
    /// Resolve settings following the priority order described in the
    /// module docs.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit path (must exist and parse)
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: platform config directory
        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("wavecell").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Priority 4: compiled defaults
        debug!("No config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Full path of the on-disk index document
    pub fn index_path(&self) -> PathBuf {
        self.storage_dir.join(&self.index_filename)
    }
}
