//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use self::logging::{file_writer, init_logging, LogFile};
pub use self::metrics::{
    increment, install_exporter, record_latency, set_gauge, CounterMetric, GaugeMetric,
    LatencyMetric,
};

use crate::config::TelemetryConfig;
use tracing_appender::non_blocking::WorkerGuard;

/// Guard that keeps telemetry alive for the process lifetime
///
/// Dropping it flushes buffered file log lines.
pub struct TelemetryGuard {
    _log_file: Option<WorkerGuard>,
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    let log_file = config.log_file.as_ref().map(|path| LogFile {
        path: path.clone(),
        keep: config.log_files_kept,
    });
    let guard = init_logging(&config.log_level, config.log_format, log_file.as_ref())?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    Ok(TelemetryGuard { _log_file: guard })
}
