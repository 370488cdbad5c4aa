//! Server configuration.
//!
//! Layered: built-in defaults < TOML file < `REEL_*` environment variables.
//! The result is validated once and read-only afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error in '{path}': {reason}")]
    TomlParseFailed { path: PathBuf, reason: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Where session logs are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process memory; lost on restart.
    Memory,
    /// One JSON document per session under `data_dir`.
    File,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(ConfigError::invalid(
                "storage",
                format!("expected 'memory' or 'file', got '{other}'"),
            )),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "127.0.0.1:3000")
    pub bind_address: String,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
    /// Directory of persisted session documents
    pub data_dir: PathBuf,
    /// Directory of recorded video streams
    pub media_dir: PathBuf,
    /// Session storage backend
    pub storage: StorageKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            cors_origin: "*".to_string(),
            data_dir: PathBuf::from("./tmp/sessions"),
            media_dir: PathBuf::from("./tmp/media"),
            storage: StorageKind::File,
        }
    }
}

impl ServerConfig {
    /// Load defaults, then the optional TOML file, then the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the merged
    /// configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Override fields from `REEL_*` variables supplied by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `REEL_STORAGE` names an unknown backend.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(address) = lookup("REEL_BIND_ADDRESS") {
            self.bind_address = address;
        }
        if let Some(origin) = lookup("REEL_CORS_ORIGIN") {
            self.cors_origin = origin;
        }
        if let Some(dir) = lookup("REEL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("REEL_MEDIA_DIR") {
            self.media_dir = PathBuf::from(dir);
        }
        if let Some(storage) = lookup("REEL_STORAGE") {
            self.storage = storage.parse()?;
        }
        Ok(self)
    }

    /// Check the merged configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.cors_origin.trim().is_empty() {
            return Err(ConfigError::invalid("cors_origin", "must not be empty"));
        }
        if self.media_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("media_dir", "must not be empty"));
        }
        if self.storage == StorageKind::File && self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "data_dir",
                "must not be empty with file storage",
            ));
        }
        Ok(())
    }

    /// The bind address as a socket address.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind_address` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|e| ConfigError::invalid("bind_address", format!("{e}")))
    }
}
