use std::path::PathBuf;

use thiserror::Error;

/// Failure to build an [`AppConfig`](super::AppConfig) from its sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
