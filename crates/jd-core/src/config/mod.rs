//! Configuration DTOs.

pub mod app_config;
mod error;

pub use app_config::{AppConfig, CacheConfig, LoggingConfig};
pub use error::ConfigError;
