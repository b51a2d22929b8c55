//! Configuration file support.
//!
//! Settings are stored as JSON. Every field has a default, so partial files
//! (or no file at all) are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::WriteOptions;

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Default number of majority-filter passes for batch filtering.
pub const DEFAULT_FILTER_PASSES: u32 = 1;

/// Errors while loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Majority-filter passes applied by batch filtering
    #[serde(default = "default_filter_passes")]
    pub filter_passes: u32,

    /// Also write the full-frame object-id bitmap
    #[serde(default)]
    pub export_frame_map: bool,

    /// Pretty-print ground truth documents
    #[serde(default = "default_pretty_json")]
    pub pretty_json: bool,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_filter_passes() -> u32 {
    DEFAULT_FILTER_PASSES
}

fn default_pretty_json() -> bool {
    true
}

impl Default for GtConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            filter_passes: DEFAULT_FILTER_PASSES,
            export_frame_map: false,
            pretty_json: default_pretty_json(),
        }
    }
}

impl GtConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GtConfig = serde_json::from_str(json)?;
        if config.version != CONFIG_VERSION {
            log::warn!(
                "Config version {} differs from current version {}",
                config.version,
                CONFIG_VERSION
            );
        }
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl From<&GtConfig> for WriteOptions {
    fn from(config: &GtConfig) -> Self {
        WriteOptions::new()
            .export_frame_map(config.export_frame_map)
            .pretty_json(config.pretty_json)
    }
}
