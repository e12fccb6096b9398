//! Configuration management for the integrity engine.
//!
//! Loads configuration from a TOML file; CLI flags override individual
//! values.

use crate::manifest::ManifestFormat;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Streaming window size in bytes (default: 32 MiB)
    #[serde(default = "default_window_size")]
    pub window_size: u64,

    /// Number of hashing worker threads (0 = hardware concurrency)
    #[serde(default)]
    pub worker_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Wire format to write (text, binary)
    #[serde(default = "default_format")]
    pub format: String,

    /// File stem of the implied manifest output location
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanConfig {
    /// Follow symbolic links during enumeration
    #[serde(default)]
    pub follow_links: bool,

    /// Name fragments to exclude from enumeration
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_window_size() -> u64 {
    32 * 1024 * 1024 // 32 MiB
}

fn default_format() -> String {
    "text".to_string()
}

fn default_file_stem() -> String {
    "Hash".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            worker_threads: 0,
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            file_stem: default_file_stem(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// The configured manifest write format
    pub fn write_format(&self) -> Result<ManifestFormat> {
        ManifestFormat::parse(&self.manifest.format)
    }
}
