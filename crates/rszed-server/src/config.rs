//! Configuration management for the rszed server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use rszed_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use rszed_domain::DispatchCacheConfig;
use rszed_storage::MemoryDataStoreConfig;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Watch stream settings
    #[serde(default)]
    pub watch: WatchSettings,

    /// Dispatch cache settings
    #[serde(default)]
    pub dispatch_cache: DispatchCacheSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Watch stream settings.
///
/// These settings can be overridden via environment variables with the `RSZED_` prefix
/// and `__` as the nested key separator:
///
/// - `RSZED_WATCH__BUFFER_LENGTH=256` - Per-subscriber change feed buffer
/// - `RSZED_WATCH__BUFFER_WRITE_TIMEOUT_MS=500` - Slow consumer cutoff
/// - `RSZED_WATCH__BROADCAST_CAPACITY=4096` - Batches a feed may lag before disconnect
///
/// # Example YAML Configuration
///
/// ```yaml
/// watch:
///   buffer_length: 128
///   buffer_write_timeout_ms: 1000
///   response_buffer: 64
///   broadcast_capacity: 1024
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WatchSettings {
    /// Number of change batches buffered per subscriber before the feed blocks.
    #[serde(default = "default_watch_buffer_length")]
    pub buffer_length: usize,

    /// How long the feed waits on a full subscriber buffer before
    /// disconnecting it with `ResourceExhausted`.
    #[serde(default = "default_buffer_write_timeout_ms")]
    pub buffer_write_timeout_ms: u64,

    /// Number of responses buffered between a watch worker and its client.
    #[serde(default = "default_response_buffer")]
    pub response_buffer: usize,

    /// Number of committed batches a live feed may fall behind before it is
    /// disconnected with `ResourceExhausted`.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            buffer_length: default_watch_buffer_length(),
            buffer_write_timeout_ms: default_buffer_write_timeout_ms(),
            response_buffer: default_response_buffer(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl WatchSettings {
    /// Builds the in-memory datastore's feed tuning from these settings.
    pub fn to_memory_config(&self) -> MemoryDataStoreConfig {
        MemoryDataStoreConfig {
            watch_buffer_length: self.buffer_length,
            buffer_write_timeout: Duration::from_millis(self.buffer_write_timeout_ms),
            broadcast_capacity: self.broadcast_capacity,
        }
    }
}

fn default_watch_buffer_length() -> usize {
    128
}

fn default_buffer_write_timeout_ms() -> u64 {
    1000
}

fn default_response_buffer() -> usize {
    64
}

fn default_broadcast_capacity() -> usize {
    1024
}

/// Dispatch cache settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DispatchCacheSettings {
    /// Enable the dispatch result cache
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of cached results
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for DispatchCacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl DispatchCacheSettings {
    pub fn to_cache_config(&self) -> DispatchCacheConfig {
        DispatchCacheConfig::default()
            .with_enabled(self.enabled)
            .with_max_capacity(self.max_capacity)
            .with_ttl(Duration::from_secs(self.ttl_secs))
    }
}

fn default_cache_capacity() -> u64 {
    100_000
}

fn default_cache_ttl() -> u64 {
    10
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `RSZED_` and use `__` as separator.
    /// For example:
    /// - `RSZED_SERVER__PORT=9090` overrides `server.port`
    /// - `RSZED_WATCH__BUFFER_LENGTH=256` overrides `watch.buffer_length`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            // RSZED_SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("RSZED")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix("RSZED")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.watch.buffer_length == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "watch.buffer_length must be greater than 0".to_string(),
            });
        }

        if self.watch.buffer_write_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "watch.buffer_write_timeout_ms must be greater than 0".to_string(),
            });
        }

        if self.watch.response_buffer == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "watch.response_buffer must be greater than 0".to_string(),
            });
        }

        if self.watch.broadcast_capacity == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "watch.broadcast_capacity must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090

watch:
  buffer_length: 16
  buffer_write_timeout_ms: 250
  broadcast_capacity: 2048

dispatch_cache:
  enabled: true
  ttl_secs: 30

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.watch.buffer_length, 16);
        assert_eq!(config.watch.buffer_write_timeout_ms, 250);
        assert_eq!(config.watch.response_buffer, 64); // default
        assert_eq!(config.watch.broadcast_capacity, 2048);
        assert!(config.dispatch_cache.enabled);
        assert_eq!(config.dispatch_cache.ttl_secs, 30);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 8080
"#
        )
        .unwrap();

        std::env::set_var("RSZED_SERVER__PORT", "9999");
        std::env::set_var("RSZED_WATCH__BUFFER_LENGTH", "7");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("RSZED_SERVER__PORT");
        std::env::remove_var("RSZED_WATCH__BUFFER_LENGTH");

        let config = config.unwrap();
        assert_eq!(config.server.port, 9999); // Overridden by env
        assert_eq!(config.server.host, "127.0.0.1"); // From file
        assert_eq!(config.watch.buffer_length, 7); // Overridden by env
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));

        let mut config = ServerConfig::default();
        config.watch.buffer_length = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watch.buffer_length"));

        let mut config = ServerConfig::default();
        config.watch.buffer_write_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watch.buffer_write_timeout_ms"));

        let mut config = ServerConfig::default();
        config.watch.response_buffer = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watch.response_buffer"));

        let mut config = ServerConfig::default();
        config.watch.broadcast_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watch.broadcast_capacity"));

        let mut config = ServerConfig::default();
        config.logging.level = "invalid".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/config.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.watch.buffer_length, 128);
        assert!(!config.dispatch_cache.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("RSZED_SERVER__HOST", "192.168.1.1");

        let config = ServerConfig::from_env();

        std::env::remove_var("RSZED_SERVER__HOST");

        let config = config.unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 8080); // default
    }

    #[test]
    fn test_settings_convert_to_runtime_configs() {
        let mut config = ServerConfig::default();
        config.watch.buffer_length = 9;
        config.watch.buffer_write_timeout_ms = 150;
        config.watch.broadcast_capacity = 32;
        config.dispatch_cache.enabled = true;
        config.dispatch_cache.ttl_secs = 3;

        let memory = config.watch.to_memory_config();
        assert_eq!(memory.watch_buffer_length, 9);
        assert_eq!(memory.buffer_write_timeout, Duration::from_millis(150));
        assert_eq!(memory.broadcast_capacity, 32);

        let cache = config.dispatch_cache.to_cache_config();
        assert!(cache.enabled);
        assert_eq!(cache.default_ttl, Duration::from_secs(3));
    }
}
