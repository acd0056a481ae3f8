use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_URL: &str = "mongodb://localhost:27017";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const CONFIG_DIR_ENV: &str = "LEAF_CONFIG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_url: String,
    pub log_filter: String,
    pub default_profile: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            default_profile: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    pub fn load_default() -> Result<Self, ConfigError> {
        let dir = config_dir().ok_or(ConfigError::ConfigDirUnavailable)?;
        Self::load_from_path(dir.join("config.toml"))
    }

    /// A missing or blank file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Directory holding `config.toml`, `profiles.toml`, the audit trail and logs.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    let base_dir = if let Some(custom) = env::var_os(CONFIG_DIR_ENV) {
        PathBuf::from(custom)
    } else if cfg!(target_os = "windows") {
        PathBuf::from(env::var_os("APPDATA")?)
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        PathBuf::from(env::var_os("HOME")?).join(".config")
    };

    Some(base_dir.join("leaf"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, DEFAULT_URL};

    #[test]
    fn missing_or_blank_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        assert_eq!(
            AppConfig::load_from_path(&path).expect("missing file loads"),
            AppConfig::default()
        );

        std::fs::write(&path, "  \n").expect("failed to write config");
        let config = AppConfig::load_from_path(&path).expect("blank file loads");
        assert_eq!(config.default_url, DEFAULT_URL);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_profile = \"staging\"\nlog_filter = \"debug\"\n")
            .expect("failed to write config");

        let config = AppConfig::load_from_path(&path).expect("failed to load config");
        assert_eq!(config.default_profile.as_deref(), Some("staging"));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.default_url, DEFAULT_URL);
    }

    #[test]
    fn malformed_file_is_reported() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_url = [").expect("failed to write config");

        let error = AppConfig::load_from_path(&path).expect_err("parse must fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }
}
