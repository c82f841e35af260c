//! Configuration management for the WebExplorer daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/webexplorer/config.toml`.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::files::transfer::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("bind_address must be an IP address, got {0}")]
    InvalidBindAddress(String),

    #[error("max_blocking_threads must be between 1 and 1024, got {0}")]
    InvalidMaxBlockingThreads(usize),

    #[error("chunk_size must be between 1 and 1048576 bytes, got {0}")]
    InvalidChunkSize(usize),

    #[error("default_path must not be empty")]
    EmptyDefaultPath,
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default grace period for in-flight responses on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Main configuration structure for the WebExplorer daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Filesystem access configuration.
    pub file: FileConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Directory for daily-rotated log files. Logs go to stdout only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_address: String,

    /// Port to listen on (0 picks a free port).
    pub port: u16,

    /// Async worker threads (0 = one per CPU core).
    pub worker_threads: usize,

    /// Upper bound on threads used for blocking filesystem calls.
    pub max_blocking_threads: usize,

    /// Seconds open responses get to finish once shutdown begins.
    pub shutdown_timeout_secs: u64,
}

/// Filesystem access configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Directory listed when a request carries no path.
    pub default_path: PathBuf,

    /// Directories whose children are reported as removable volumes.
    pub mount_dirs: Vec<PathBuf>,

    /// Read chunk size for file streams, in bytes.
    pub chunk_size: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            worker_threads: 0,
            max_blocking_threads: 64,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            default_path: default_root(),
            mount_dirs: vec![
                PathBuf::from("/media"),
                PathBuf::from("/run/media"),
                PathBuf::from("/Volumes"),
            ],
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webexplorer")
        .join("config.toml")
}

/// Returns the root of the primary volume for the current platform.
fn default_root() -> PathBuf {
    if cfg!(windows) {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{drive}\\"))
    } else {
        PathBuf::from("/")
    }
}

/// An environment variable seen by [`Config::apply_env_overrides`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    /// The value replaced the configured one.
    Applied { var: &'static str, value: String },
    /// The value could not be used and was skipped.
    Ignored { var: &'static str, value: String },
}

impl ServerConfig {
    /// Socket address built from `bind_address` and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - WEBEXPLORER_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - WEBEXPLORER_BIND_ADDRESS: Override listen address
    /// - WEBEXPLORER_PORT: Override listen port
    ///
    /// This runs before logging is set up, so the overrides are returned for
    /// the caller to report. Empty variables are skipped silently.
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut seen = Vec::new();

        if let Some(level) = non_empty_var("WEBEXPLORER_LOG_LEVEL") {
            self.daemon.log_level = level.clone();
            seen.push(EnvOverride::Applied {
                var: "WEBEXPLORER_LOG_LEVEL",
                value: level,
            });
        }

        if let Some(address) = non_empty_var("WEBEXPLORER_BIND_ADDRESS") {
            self.server.bind_address = address.clone();
            seen.push(EnvOverride::Applied {
                var: "WEBEXPLORER_BIND_ADDRESS",
                value: address,
            });
        }

        if let Some(value) = non_empty_var("WEBEXPLORER_PORT") {
            let var = "WEBEXPLORER_PORT";
            match value.parse::<u16>() {
                Ok(port) => {
                    self.server.port = port;
                    seen.push(EnvOverride::Applied { var, value });
                }
                Err(_) => seen.push(EnvOverride::Ignored { var, value }),
            }
        }

        seen
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        self.server.socket_addr()?;

        let threads = self.server.max_blocking_threads;
        if !(1..=1024).contains(&threads) {
            return Err(ConfigError::InvalidMaxBlockingThreads(threads));
        }

        let chunk = self.file.chunk_size;
        if !(1..=MAX_CHUNK_SIZE).contains(&chunk) {
            return Err(ConfigError::InvalidChunkSize(chunk));
        }

        if self.file.default_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDefaultPath);
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("WEBEXPLORER_LOG_LEVEL");
        std::env::remove_var("WEBEXPLORER_BIND_ADDRESS");
        std::env::remove_var("WEBEXPLORER_PORT");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert!(config.daemon.log_dir.is_none());
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.max_blocking_threads, 64);
        assert_eq!(
            config.server.shutdown_timeout_secs,
            DEFAULT_SHUTDOWN_TIMEOUT_SECS
        );
        assert_eq!(config.file.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.file.mount_dirs.len(), 3);
    }

    #[test]
    #[cfg(unix)]
    fn test_default_root_unix() {
        assert_eq!(FileConfig::default().default_path, PathBuf::from("/"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::default();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");

        let mut config = ServerConfig::default();
        config.bind_address = "::1".to_string();
        config.port = 0;
        assert_eq!(config.socket_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[daemon]
log_level = "debug"

[server]
port = 9000
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.file, FileConfig::default());
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[daemon]
log_level = "trace"
log_dir = "/var/log/webexplorer"

[server]
bind_address = "0.0.0.0"
port = 8443
worker_threads = 4
max_blocking_threads = 16
shutdown_timeout_secs = 3

[file]
default_path = "/srv/share"
mount_dirs = ["/mnt"]
chunk_size = 8192
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.daemon.log_level, "trace");
        assert_eq!(config.daemon.log_dir, Some(PathBuf::from("/var/log/webexplorer")));
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 8443);
        assert_eq!(config.server.worker_threads, 4);
        assert_eq!(config.server.max_blocking_threads, 16);
        assert_eq!(config.server.shutdown_timeout_secs, 3);
        assert_eq!(config.file.default_path, PathBuf::from("/srv/share"));
        assert_eq!(config.file.mount_dirs, vec![PathBuf::from("/mnt")]);
        assert_eq!(config.file.chunk_size, 8192);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let toml = r#"
[server
port = 1
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[server]
port = "eighty"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let toml = r#"
[server]
port = 70000
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_to_toml_sections() {
        let toml = Config::default().to_toml().unwrap();
        assert!(toml.contains("[daemon]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[file]"));
        assert!(!toml.contains("log_dir"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = Config::default();
        original.daemon.log_dir = Some(PathBuf::from("/tmp/logs"));
        original.server.port = 3000;
        original.file.mount_dirs = vec![PathBuf::from("/mnt/usb")];

        let loaded = Config::from_toml(&original.to_toml().unwrap()).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.daemon.log_level = "debug".to_string();
        original.server.max_blocking_threads = 8;

        original.save(&config_path).unwrap();
        assert!(config_path.exists());

        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid [ toml").unwrap();

        let err = Config::load(&config_path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("webexplorer"));
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_validate_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();

        config.daemon.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "warning".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("warning".to_string()))
        );

        config.daemon.log_level = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "localhost".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBindAddress("localhost".to_string()))
        );

        config.server.bind_address = "0.0.0.0".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_blocking_threads_bounds() {
        let mut config = Config::default();

        config.server.max_blocking_threads = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMaxBlockingThreads(0))
        );

        config.server.max_blocking_threads = 1025;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidMaxBlockingThreads(1025))
        );

        config.server.max_blocking_threads = 1;
        assert!(config.validate().is_ok());
        config.server.max_blocking_threads = 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_chunk_size_bounds() {
        let mut config = Config::default();

        config.file.chunk_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidChunkSize(0)));

        config.file.chunk_size = MAX_CHUNK_SIZE + 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(MAX_CHUNK_SIZE + 1))
        );

        config.file.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_default_path() {
        let mut config = Config::default();
        config.file.default_path = PathBuf::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyDefaultPath));
    }

    #[test]
    #[serial]
    fn test_env_override_log_level() {
        clear_env();
        std::env::set_var("WEBEXPLORER_LOG_LEVEL", "debug");

        let mut config = Config::default();
        let seen = config.apply_env_overrides();
        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(
            seen,
            vec![EnvOverride::Applied {
                var: "WEBEXPLORER_LOG_LEVEL",
                value: "debug".to_string(),
            }]
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        clear_env();
        std::env::set_var("WEBEXPLORER_LOG_LEVEL", "");
        std::env::set_var("WEBEXPLORER_BIND_ADDRESS", "");
        std::env::set_var("WEBEXPLORER_PORT", "");

        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_empty());
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_bind_and_port() {
        clear_env();
        std::env::set_var("WEBEXPLORER_BIND_ADDRESS", "0.0.0.0");
        std::env::set_var("WEBEXPLORER_PORT", "9999");

        let mut config = Config::default();
        let seen = config.apply_env_overrides();
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert_eq!(seen.len(), 2);
        assert!(seen
            .iter()
            .all(|o| matches!(o, EnvOverride::Applied { .. })));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_port_ignored() {
        clear_env();
        std::env::set_var("WEBEXPLORER_PORT", "not-a-port");

        let mut config = Config::default();
        let seen = config.apply_env_overrides();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(
            seen,
            vec![EnvOverride::Ignored {
                var: "WEBEXPLORER_PORT",
                value: "not-a-port".to_string(),
            }]
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        clear_env();

        let mut config = Config::default();
        assert!(config.apply_env_overrides().is_empty());
        assert_eq!(config, Config::default());
    }
}
