//! Directory configuration.
//!
//! A single TOML-loadable configuration describing where the directory keeps
//! its snapshot and how it logs. Every field has a default so a partial file
//! (or none at all) is valid.

use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_name() -> String {
    "directory".to_string()
}

fn default_capacity() -> usize {
    5
}

/// Directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory holding the snapshot file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Snapshot file stem; the file lands at `<data_dir>/<name>.map`
    #[serde(default = "default_name")]
    pub name: String,

    /// Capacity applied to registering machines that do not state their own
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            name: default_name(),
            default_capacity: default_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DirectoryConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DirectoryError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            DirectoryError::Config(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Open the directory this configuration describes.
    pub fn open(&self) -> Directory {
        Directory::open(&self.data_dir, &self.name, self.default_capacity)
    }
}
