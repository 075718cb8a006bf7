//! Error types for obras-core

use thiserror::Error;

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

/// Main error type for portal operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Store target or credential missing; raised before any remote call
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Pre-flight validation failed (no project, no files, unknown project)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Content store errors (remote, network, conflict)
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Manifest (de)serialization errors
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Local file access errors
    #[error("IO error: {0}")]
    Io(String),
}

/// Content store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Any non-2xx answer from the content API
    #[error("GitHub API {status}: {message}")]
    Remote { status: u16, message: String },

    /// Version token did not match the remote file
    #[error("Conflict writing {path}: {message}")]
    Conflict { path: String, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether this error is a stale-write rejection
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("TOML write error: {0}")]
    Write(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("No config directory available on this platform")]
    NoConfigDir,
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Write(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Manifest(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Io(err.to_string())
    }
}
