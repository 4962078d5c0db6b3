//! # Configuration Resolution / 配置解析
//!
//! Picks which file to read and hands it to the layered loader in `jd-infra`.
//! 选择配置文件，交由 `jd-infra` 的分层加载器处理。
//!
//! - An explicit `--config` path must exist.
//! - The default path (`<config dir>/jobdesk/config.toml`) is optional.

use anyhow::Context;
use std::path::{Path, PathBuf};

use jd_core::AppConfig;
use jd_infra::load_app_config;

/// Platform config location, e.g. `~/.config/jobdesk/config.toml` on Linux.
/// 平台默认配置路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jobdesk").join("config.toml"))
}

/// Resolve the effective configuration.
/// 解析最终生效的配置。
///
/// # Errors / 错误
///
/// Returns error if an explicit path does not exist, or if any file that is
/// read does not parse.
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    match explicit {
        Some(path) => {
            anyhow::ensure!(
                path.exists(),
                "Config file not found: {}",
                path.display()
            );
            load_app_config(Some(path))
                .with_context(|| format!("Failed to load config: {}", path.display()))
        }
        None => {
            let default_path = default_config_path();
            load_app_config(default_path.as_deref()).context("Failed to load default config")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("jobdesk/config.toml"));
        }
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve_config(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_explicit_file_is_read() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[cache]\nmutation_timeout_ms = 1500\nrevalidate_on_focus = false\n")
            .unwrap();

        let config = resolve_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.cache.mutation_timeout_ms, 1500);
        assert!(!config.cache.revalidate_on_focus);
        assert_eq!(config.cache.dedupe_interval_ms, 5_000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[cache\nbroken").unwrap();
        assert!(resolve_config(Some(temp_file.path())).is_err());
    }
}
