use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::AppConfig;

/// Config file looked up in the working directory when `--config` is absent
pub const CONFIG_FILE: &str = "dayplan.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Parse a config file.
pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Load the config. An explicit path must exist; the default file is
/// optional and its absence yields the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                read_config(path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Overlay environment variables: `DATA_PATH`, `BACKUP_ENABLED` and
/// `LOG_LEVEL`. The lookup is injected so callers decide where values come from.
pub fn apply_env(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = var("DATA_PATH").filter(|v| !v.is_empty()) {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(flag) = var("BACKUP_ENABLED") {
        config.storage.backup_enabled = flag.trim() == "true";
    }
    if let Some(level) = var("LOG_LEVEL").filter(|v| !v.is_empty()) {
        config.log.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.storage.max_backups, 10);
        assert_eq!(config.storage.retention_days, 7);
        assert_eq!(config.autosave.debounce_ms, 500);
        assert_eq!(config.log.level, "warn");
        assert!(!config.storage.backup_enabled);
    }

    #[test]
    fn partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[storage]\ndata_dir = \"/srv/plan\"\nbackup_enabled = true\n\n[autosave]\ndebounce_ms = 50\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/plan"));
        assert!(config.storage.backup_enabled);
        assert_eq!(config.storage.max_backups, 10);
        assert_eq!(config.autosave.debounce_ms, 50);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, "[storage\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env(&[("DATA_PATH", "/tmp/plan"), ("BACKUP_ENABLED", "true"), ("LOG_LEVEL", "debug")]),
        );
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/plan"));
        assert!(config.storage.backup_enabled);
        assert_eq!(config.log.level, "debug");

        apply_env(&mut config, env(&[("BACKUP_ENABLED", "yes")]));
        assert!(!config.storage.backup_enabled);
    }

    #[test]
    fn no_env_leaves_config_alone() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[]));
        assert_eq!(config, AppConfig::default());
    }
}
