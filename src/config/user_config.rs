//! User-level configuration for myprofiler
//!
//! Supports loading sampling defaults from:
//! - ~/.config/myprofiler/config.toml (platform config dir)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub sampling: SamplingSettings,
}

/// Partially specified sampling settings (from a file or the command line)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SamplingSettings {
    /// Seconds between snapshots (fractions allowed)
    pub interval: Option<f64>,

    /// Rounds between reports
    pub delay: Option<u32>,

    /// Statements per report
    pub top: Option<usize>,

    /// Rounds kept by the windowed summary (0 = lifetime totals)
    pub last: Option<usize>,
}

impl UserConfig {
    /// Load the user config file, falling back to defaults.
    ///
    /// A missing file is normal. An unreadable or invalid file is logged and
    /// ignored so a typo never stops the profiler from starting.
    pub fn load() -> Self {
        let Some(path) = Self::user_config_path().filter(|p| p.exists()) else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => {
                debug!("Loaded user config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring user config: {}", e);
                Self::default()
            }
        }
    }

    /// Load and parse a specific config file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("myprofiler").join("config.toml"))
    }
}
