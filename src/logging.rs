//! Logging setup.
//!
//! One-shot CLI commands log to stderr so their stdout stays scriptable.
//! `serve` can log to `<state>/logs/swapboard-<timestamp>.log` instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// How the process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Cli,
    Server,
}

/// Where log lines end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File { dir: PathBuf, file_name: String },
}

impl LogTarget {
    /// File logging only applies to the long-running server
    pub fn select(config: &Config, mode: LogMode, started_at: DateTime<Utc>) -> Self {
        if mode == LogMode::Server && config.logging.to_file {
            LogTarget::File {
                dir: config.logs_path(),
                file_name: format!("swapboard-{}.log", started_at.format("%Y%m%dT%H%M%SZ")),
            }
        } else {
            LogTarget::Stderr
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        match self {
            LogTarget::Stderr => None,
            LogTarget::File { dir, file_name } => Some(dir.join(file_name)),
        }
    }
}

/// Keeps the background writer alive; buffered lines are flushed on drop
pub struct LoggingHandle {
    _guard: Option<WorkerGuard>,
    pub log_file_path: Option<PathBuf>,
}

/// `RUST_LOG` wins over the configured level; `--debug` wins over both
fn level_filter(config: &Config, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
}

/// Install the global subscriber
pub fn init_logging(config: &Config, mode: LogMode, debug: bool) -> Result<LoggingHandle> {
    let target = LogTarget::select(config, mode, Utc::now());

    let (writer, guard) = match &target {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
        LogTarget::File { dir, file_name } => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(level_filter(config, debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(target == LogTarget::Stderr)
                .with_writer(writer),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LoggingHandle {
        _guard: guard,
        log_file_path: target.path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir, to_file: bool) -> Config {
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();
        config.logging.to_file = to_file;
        config
    }

    #[test]
    fn test_server_logs_to_timestamped_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir, true);
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 5).unwrap();

        let target = LogTarget::select(&config, LogMode::Server, started);

        let path = target.path().unwrap();
        assert!(path.starts_with(temp_dir.path().join("logs")));
        assert!(path.ends_with("swapboard-20260301T093005Z.log"));
    }

    #[test]
    fn test_cli_always_logs_to_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir, true);

        assert_eq!(
            LogTarget::select(&config, LogMode::Cli, Utc::now()),
            LogTarget::Stderr
        );
    }

    #[test]
    fn test_server_without_file_logging() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir, false);

        let target = LogTarget::select(&config, LogMode::Server, Utc::now());
        assert_eq!(target, LogTarget::Stderr);
        assert!(target.path().is_none());
    }
}
