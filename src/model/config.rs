use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration from dayplan.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding tasks.json, projects.json and backups/
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub backup_enabled: bool,
    /// Backups kept per data file
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    /// Default age cutoff for `dp backup prune`
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: default_data_dir(),
            backup_enabled: false,
            max_backups: default_max_backups(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet window before a scheduled save fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_backups() -> usize {
    10
}

fn default_retention_days() -> i64 {
    7
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "warn".to_string()
}
