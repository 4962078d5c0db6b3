//! Layered application config: defaults, then an optional TOML file, then
//! `JOBDESK__`-prefixed environment variables.

use std::path::Path;

use config::{Config, Environment, File, FileFormat, Map};
use tracing::debug;

use jd_core::{AppConfig, ConfigError};

pub const ENV_PREFIX: &str = "JOBDESK";

/// Load the configuration, reading the process environment.
///
/// A `path` that does not exist is skipped; only a file that exists but
/// cannot be parsed is an error.
pub fn load_app_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, None)
}

/// Same as [`load_app_config`] but with an explicit environment instead of the
/// process one.
pub fn load_with_env(
    path: Option<&Path>,
    env: Option<Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let defaults = Config::try_from(&AppConfig::default())
        .map_err(|e| ConfigError::Invalid(format!("defaults: {e}")))?;

    let mut builder = Config::builder().add_source(defaults);

    if let Some(path) = path {
        if path.exists() {
            debug!(path = %path.display(), "reading config file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let layered = builder.build().map_err(|e| match path {
        Some(path) => ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
        None => ConfigError::Invalid(e.to_string()),
    })?;

    layered
        .try_deserialize::<AppConfig>()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}
