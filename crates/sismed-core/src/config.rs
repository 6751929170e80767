//! Application configuration.
//!
//! Configuration is loaded from (in order of precedence, highest first):
//! 1. Environment variables prefixed with `SISMED_` (nested keys split on `__`,
//!    e.g. `SISMED_STORAGE__DATABASE_PATH`)
//! 2. TOML config file, by default `~/.config/sismed/config.toml`
//! 3. Default values

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATA_DIR_NAME: &str = "sismed";
const DATABASE_FILE_NAME: &str = "sismed.db";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-level configuration, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Key-value database file. Defaults to `<data dir>/sismed/sismed.db`.
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sismed_core=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(None)
    }

    /// Load with an optional explicit config file path.
    pub fn load_from(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file(&config_file))
                .merge(Env::prefixed("SISMED_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> ConfigResult<Self> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Database path, resolving the default if not set.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.filter cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.logging.filter, "sismed_core=info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_database_path() {
        let config = AppConfig::default();
        let path = config.database_path();
        assert!(path.ends_with("sismed/sismed.db"));
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "[storage]\ndatabase_path = \"/tmp/clinic.db\"\n\n[logging]\nfilter = \"debug\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(file)).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/clinic.db"));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(Some(dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_filter_rejected() {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("[logging]\nfilter = \"  \"\n"));
        let result = AppConfig::from_figment(figment);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
