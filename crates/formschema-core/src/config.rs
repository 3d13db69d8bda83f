//! Registry configuration
//!
//! Loaded from a JSON, TOML or YAML file chosen by extension, then
//! overridden by `FORMSCHEMA_*` environment variables.

use crate::store::{LocalSchemaStore, MemorySchemaStore, SchemaStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single storage call (10 seconds)
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    /// JSON documents in a local directory
    Local,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory for the local backend; defaults to `~/.formschema/schemas`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            path: None,
        }
    }
}

impl StorageConfig {
    /// Open the configured store
    pub fn open(&self) -> StoreResult<Arc<dyn SchemaStore>> {
        let store: Arc<dyn SchemaStore> = match self.backend {
            StorageBackend::Memory => Arc::new(MemorySchemaStore::new()),
            StorageBackend::Local => match self.path {
                Some(ref path) => Arc::new(LocalSchemaStore::with_path(path.clone())),
                None => Arc::new(LocalSchemaStore::new()?),
            },
        };
        Ok(store)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Top-level registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub storage: StorageConfig,

    /// Upper bound for each storage call made by the service
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    pub logging: LoggingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Load from file (if present) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `FORMSCHEMA_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = env::var("FORMSCHEMA_STORE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(backend) = env::var("FORMSCHEMA_STORE_BACKEND") {
            self.storage.backend = match backend.to_lowercase().as_str() {
                "memory" => StorageBackend::Memory,
                "local" => StorageBackend::Local,
                other => {
                    return Err(ConfigError::Env {
                        var: "FORMSCHEMA_STORE_BACKEND",
                        message: format!("unknown backend '{}'", other),
                    });
                }
            };
        }

        if let Ok(timeout) = env::var("FORMSCHEMA_TIMEOUT") {
            self.operation_timeout =
                humantime_serde::re::humantime::parse_duration(&timeout).map_err(|e| {
                    ConfigError::Env {
                        var: "FORMSCHEMA_TIMEOUT",
                        message: e.to_string(),
                    }
                })?;
        }

        if let Ok(level) = env::var("FORMSCHEMA_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> Result<RegistryConfig, ConfigError> {
    if !path.exists() {
        return Ok(RegistryConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        _ => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("formschema.toml");
        fs::write(
            &path,
            r#"
operation_timeout = "2s 500ms"

[storage]
backend = "memory"

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.operation_timeout, Duration::from_millis(2500));
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_yaml_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("formschema.yaml");
        fs::write(&path, "storage:\n  backend: local\n  path: /tmp/schemas\n").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/schemas")));
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("formschema.json");
        fs::write(&path, "{ nope").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
