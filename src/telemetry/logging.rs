//! Structured logging setup

use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Where log lines go besides the console
#[derive(Debug, Clone)]
pub struct LogFile {
    pub path: PathBuf,
    /// Rotated files kept on disk
    pub keep: usize,
}

/// Daily-rotated, non-blocking writer for `file`
///
/// Files are named `<name>.<date>` in the configured directory. Lines are
/// flushed when the returned guard is dropped.
pub fn file_writer(file: &LogFile) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    let dir = file
        .path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = file
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {:?}", file.path))?;

    fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .max_log_files(file.keep.max(1))
        .build(dir)
        .map_err(|e| anyhow::anyhow!("Failed to open log file {:?}: {}", file.path, e))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with the given level and format
///
/// `RUST_LOG` takes precedence over the configured level. When `file` is
/// given, plain-text lines are also written there; keep the returned guard
/// alive for the process lifetime.
pub fn init_logging(
    level: &str,
    format: LogFormat,
    file: Option<&LogFile>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match file {
        Some(file) => {
            let (writer, guard) = file_writer(file)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };
    let file_layer = writer.map(|w| fmt::layer().with_writer(w).with_ansi(false));
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    Ok(guard)
}
