//! # Pure Data Module / 纯数据模块
//!
//! Configuration data structures with their documented defaults.
//! Loading and layering (file, environment) belongs to the infrastructure layer.
//! 加载与分层（文件、环境变量）属于基础设施层。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Cache and mutation behaviour
/// 缓存与变更行为
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Background triggers within this window of the last completed fetch are ignored.
    pub dedupe_interval_ms: u64,
    /// Mutations that do not settle within this time are rolled back.
    pub mutation_timeout_ms: u64,
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    /// Refetch a key after each reconciled mutation to pick up server side effects.
    pub revalidate_after_mutation: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dedupe_interval_ms: 5_000,
            mutation_timeout_ms: 30_000,
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            revalidate_after_mutation: true,
        }
    }
}

impl CacheConfig {
    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_millis(self.mutation_timeout_ms)
    }
}

/// Logging output
/// 日志输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives; `None` means the build default (debug/info).
    pub level: Option<String>,
    /// When set, logs are also written to daily files in this directory.
    pub dir: Option<PathBuf>,
}
