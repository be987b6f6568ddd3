//! Configuration module for myprofiler
//!
//! This module handles:
//! - Sampling settings (interval, cadence, report size, retention window)
//! - User-level defaults (~/.config/myprofiler/config.toml)
//! - MySQL option files (~/.my.cnf) and connection settings

mod connection;
mod option_file;
mod user_config;

pub use connection::{ConnectionConfig, ConnectionOverrides};
pub use option_file::OptionFile;
pub use user_config::{SamplingSettings, UserConfig};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("no database user configured; pass --user or set user in the [client] group")]
    MissingUser,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Fully resolved settings of the sampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    /// Pause between two snapshots
    pub interval: Duration,
    /// Rounds between two reports
    pub delay: u32,
    /// Statements per report
    pub top: usize,
    /// Rounds kept by the windowed summary (0 = lifetime totals)
    pub last: usize,
    /// Stop after this many rounds (None = until cancelled)
    pub rounds: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            delay: 1,
            top: 10,
            last: 0,
            rounds: None,
        }
    }
}

impl SamplingConfig {
    /// Merge command line settings over file defaults over built-ins.
    pub fn resolve(
        flags: &SamplingSettings,
        file: &SamplingSettings,
        rounds: Option<u64>,
    ) -> ConfigResult<Self> {
        let defaults = Self::default();

        let interval = match flags.interval.or(file.interval) {
            Some(secs) => parse_interval(secs)?,
            None => defaults.interval,
        };

        Ok(Self {
            interval,
            // A cadence of 0 would report every round, same as 1.
            delay: flags.delay.or(file.delay).unwrap_or(defaults.delay).max(1),
            top: flags.top.or(file.top).unwrap_or(defaults.top),
            last: flags.last.or(file.last).unwrap_or(defaults.last),
            rounds,
        })
    }
}

/// Convert fractional seconds into a sleep duration.
pub fn parse_interval(secs: f64) -> ConfigResult<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key: "interval".to_string(),
        value: secs.to_string(),
    })
}
