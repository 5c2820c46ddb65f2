use std::path::PathBuf;
use thiserror::Error;

use crate::decode::DecodeError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported config format for {path} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[cfg(feature = "watch")]
    #[error("Failed to watch config source: {0}")]
    Watch(#[from] notify::Error),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to decode '{key}': {source}")]
    Decode { key: String, source: DecodeError },

    #[error("Unknown keys under '{key}': {}", .unknown.join(", "))]
    UnknownKeys { key: String, unknown: Vec<String> },

    #[error("Configuration error: {0}")]
    Confique(#[from] confique::Error),
}
