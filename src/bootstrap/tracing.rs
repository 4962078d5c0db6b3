//! Tracing subscriber setup.
//!
//! ## Behavior / 行为
//!
//! - `RUST_LOG` wins when set; otherwise `logging.level`; otherwise debug in
//!   development builds and info in release builds
//! - Human-readable lines go to stderr so stdout stays free for command output
//! - With `logging.dir` set, a daily-rotated file is written as well

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry, EnvFilter};

use jd_core::LoggingConfig;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Default filter directives when neither `RUST_LOG` nor the config set one.
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let level = if is_dev { "debug" } else { "info" };
    vec![
        "info".to_string(),
        format!("jobdesk={level}"),
        format!("jobdesk_lib={level}"),
        format!("jd_core={level}"),
        format!("jd_app={level}"),
        format!("jd_infra={level}"),
    ]
}

fn build_env_filter(logging: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    match logging.level.as_deref() {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid logging.level directive: {level}")),
        None => Ok(EnvFilter::new(
            build_filter_directives(is_development()).join(","),
        )),
    }
}

/// Initialize the global subscriber.
///
/// # Errors / 错误
///
/// Returns `Err` if a subscriber is already registered, the configured level
/// does not parse, or the log directory cannot be created.
pub fn init_tracing_subscriber(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = build_env_filter(logging)?;

    let stderr_writer: BoxMakeWriter = BoxMakeWriter::new(io::stderr);
    let stderr_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(stderr_writer);

    let file_layer = match logging.dir.as_deref() {
        Some(dir) => {
            let writer = build_file_writer(dir)?;
            Some(
                fmt::layer()
                    .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
                    .with_level(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

fn build_file_writer(dir: &Path) -> anyhow::Result<NonBlocking> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log dir failed: {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, "jobdesk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Tracing log guard already initialized"))?;

    Ok(non_blocking)
}
