//! Dual logging: human-readable console output plus rotating log files.

use serde::Deserialize;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_PREFIX: &str = "txn_pulse.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    /// `EnvFilter` directives, overridden by `RUST_LOG` when set
    pub level_filter: String,
    pub rotation: LogRotation,
    pub console_timestamps: bool,
    pub file_json_format: bool,
    /// Log files older than this are removed at startup; 0 keeps everything
    pub cleanup_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: "info,txn_pulse=info".to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
            cleanup_days: 30,
        }
    }
}

fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level_filter))
}

const TEXT_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.3f UTC";
const JSON_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Install the console and rotating-file layers.
///
/// The returned guard flushes the background file writer on drop and must
/// live as long as the process logs.
pub fn init_dual_logging(config: LoggingConfig) -> Result<WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = match config.rotation {
        LogRotation::Daily => tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX),
        LogRotation::Hourly => tracing_appender::rolling::hourly(&config.log_dir, LOG_FILE_PREFIX),
    };
    let (file_writer, guard) = non_blocking(file_appender);

    let console_format = if config.console_timestamps { TEXT_TIMESTAMP } else { "" };
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_timer(ChronoUtc::new(console_format.to_string()))
        .with_filter(filter(&config));

    let file_base = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_thread_names(true);
    let file_layer = if config.file_json_format {
        file_base
            .json()
            .with_timer(ChronoUtc::new(JSON_TIMESTAMP.to_string()))
            .with_filter(filter(&config))
            .boxed()
    } else {
        file_base
            .with_timer(ChronoUtc::new(TEXT_TIMESTAMP.to_string()))
            .with_filter(filter(&config))
            .boxed()
    };

    tracing_subscriber::registry().with(console_layer).with(file_layer).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json = config.file_json_format,
        "📁 Logging to console and {}/{}*",
        config.log_dir,
        LOG_FILE_PREFIX
    );

    Ok(guard)
}

/// Console-only logging for tests and tools; a no-op error when a subscriber is already set
pub fn init_simple_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,txn_pulse=debug")))
        .with_test_writer()
        .try_init()?;
    Ok(())
}

/// Remove this service's log files last modified more than `keep_days` ago
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    if keep_days == 0 {
        return Ok(0);
    }
    let cutoff = std::time::SystemTime::now() - std::time::Duration::from_secs(keep_days as u64 * 24 * 3600);

    let mut removed = 0;
    for entry in std::fs::read_dir(log_dir)?.flatten() {
        let path = entry.path();
        let ours = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !path.is_file() || !ours {
            continue;
        }

        let stale = path
            .metadata()
            .and_then(|m| m.modified())
            .is_ok_and(|modified| modified < cutoff);
        if stale && std::fs::remove_file(&path).is_ok() {
            removed += 1;
            tracing::debug!(path = %path.display(), "🗑️ removed stale log file");
        }
    }

    if removed > 0 {
        tracing::info!(removed, keep_days, "🧹 Removed stale log files");
    }
    Ok(removed)
}
