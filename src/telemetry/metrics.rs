//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Price fetch plus evaluation of open positions
    MonitorCycle,
    /// Universe discovery, indicators and entries
    ScanCycle,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Virtual account balance
    Capital,
    /// Open position count
    OpenPositions,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    PositionsOpened,
    PartialExits,
    StopLosses,
    FullTakeProfits,
    OtherCloses,
    /// Entries refused for capacity or size
    OpenRejections,
    /// Cycles aborted by an unexpected error
    CycleErrors,
    /// Monitoring passes skipped because prices could not be fetched
    PriceFetchErrors,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::MonitorCycle => "trend_agent_monitor_cycle_seconds",
            LatencyMetric::ScanCycle => "trend_agent_scan_cycle_seconds",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::Capital => "trend_agent_capital_usd",
            GaugeMetric::OpenPositions => "trend_agent_open_positions",
        }
    }
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::PositionsOpened => "trend_agent_positions_opened_total",
            CounterMetric::PartialExits => "trend_agent_partial_exits_total",
            CounterMetric::StopLosses => "trend_agent_stop_losses_total",
            CounterMetric::FullTakeProfits => "trend_agent_full_take_profits_total",
            CounterMetric::OtherCloses => "trend_agent_other_closes_total",
            CounterMetric::OpenRejections => "trend_agent_open_rejections_total",
            CounterMetric::CycleErrors => "trend_agent_cycle_errors_total",
            CounterMetric::PriceFetchErrors => "trend_agent_price_fetch_errors_total",
        }
    }
}

/// Install the Prometheus exporter on `0.0.0.0:port`
///
/// Without an installed recorder every metric call is a no-op.
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;
    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    ::metrics::histogram!(metric.name()).record(duration.as_secs_f64());
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}
