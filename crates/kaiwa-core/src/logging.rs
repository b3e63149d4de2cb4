//! File logging.
//!
//! Logs go to `$KAIWA_HOME/logs/kaiwa.log` through a non-blocking writer;
//! stdout belongs to the REPL. The filter comes from `KAIWA_LOG`, falling
//! back to the configured `log_level`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "KAIWA_LOG";
pub const LOG_FILE_NAME: &str = "kaiwa.log";

/// Keeps the background writer alive; flushes on drop.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Builds the filter from `KAIWA_LOG` or the configured level.
pub fn build_filter(config_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(config_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global file subscriber.
///
/// Returns `Ok(None)` when a subscriber is already installed.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init(log_dir: &Path, config_level: &str) -> Result<Option<LogGuard>> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config_level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .is_ok();

    Ok(installed.then_some(LogGuard { _guard: guard }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info() {
        let filter = build_filter("not a [valid filter");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let _guard = init(&log_dir, "debug").unwrap();
        assert!(log_dir.is_dir());
    }
}
