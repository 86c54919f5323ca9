//! Trading agent
//!
//! Single-task loop that monitors open positions every tick and scans the
//! pair universe for new entries when the scan interval has elapsed.

use futures_util::{stream, StreamExt};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::{Config, ScannerConfig, StrategyConfig};
use crate::indicators::{compute_features, FeatureBar};
use crate::ledger::CsvLedger;
use crate::market::{select_pairs, BybitClient, Candle, MarketData, MarketDataError, PairsFile};
use crate::notify;
use crate::portfolio::{EngineConfig, JsonFileStore, OpenRejection, Position, PositionEngine, PositionEvent};
use crate::risk::TradeParamCalculator;
use crate::signal::{SignalEvaluator, TrendSignal};
use crate::telemetry::{self, CounterMetric, LatencyMetric};

/// Loop timing and scan settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub scanner: ScannerConfig,
    pub strategy: StrategyConfig,
    /// Candles requested per symbol
    pub candle_limit: usize,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            scanner: config.scanner.clone(),
            strategy: config.strategy.clone(),
            candle_limit: config.exchange.candle_limit,
        }
    }
}

/// What one cycle did
#[derive(Debug, Default)]
pub struct CycleReport {
    pub events: Vec<PositionEvent>,
    pub opened: Vec<Position>,
    pub scanned: bool,
}

/// Drives the position engine from live market data
pub struct TradingAgent {
    engine: PositionEngine,
    market: Arc<dyn MarketData>,
    signal: Box<dyn SignalEvaluator>,
    calculator: TradeParamCalculator,
    settings: AgentSettings,
    pairs_file: Option<PairsFile>,
    last_scan: Option<Instant>,
}

impl TradingAgent {
    pub fn new(
        engine: PositionEngine,
        market: Arc<dyn MarketData>,
        signal: Box<dyn SignalEvaluator>,
        calculator: TradeParamCalculator,
        settings: AgentSettings,
    ) -> Self {
        let pairs_file = settings.scanner.pairs_file.as_ref().map(PairsFile::new);
        Self {
            engine,
            market,
            signal,
            calculator,
            settings,
            pairs_file,
            last_scan: None,
        }
    }

    /// Wire the production collaborators from configuration
    ///
    /// Must be called inside a tokio runtime when notifier credentials are set.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let market = Arc::new(BybitClient::new(&config.exchange)?);
        let store = JsonFileStore::new(&config.storage.state_file, config.risk.initial_capital);
        let ledger = CsvLedger::new(&config.storage.ledger_file);
        let engine = PositionEngine::new(
            EngineConfig::from(&config.risk),
            Box::new(store),
            Box::new(ledger),
            notify::from_config(&config.notifier),
        );

        Ok(Self::new(
            engine,
            market,
            Box::new(TrendSignal::from_config(&config.strategy)),
            TradeParamCalculator::from_config(&config.risk),
            AgentSettings::from_config(config),
        ))
    }

    pub fn engine(&self) -> &PositionEngine {
        &self.engine
    }

    /// Evaluate every open position against the latest prices
    pub async fn monitor(&mut self) -> Result<Vec<PositionEvent>, MarketDataError> {
        let symbols = self.engine.state().symbols();
        if symbols.is_empty() {
            return Ok(vec![]);
        }

        let started = Instant::now();
        let samples = self.market.price_samples(&symbols).await?;
        for symbol in symbols.iter().filter(|s| !samples.contains_key(*s)) {
            tracing::warn!(symbol = %symbol, "No price for open position");
        }

        let events = self.engine.evaluate_all(&samples);
        for position in self.engine.positions() {
            if let Some(sample) = samples.get(&position.symbol) {
                tracing::debug!(
                    symbol = %position.symbol,
                    price = %sample.price,
                    unrealized = %position.unrealized_pnl(sample.price),
                    "Position marked"
                );
            }
        }
        telemetry::record_latency(LatencyMetric::MonitorCycle, started.elapsed());
        Ok(events)
    }

    /// Look for entries and open as many as capacity allows
    pub async fn scan(&mut self) -> Result<Vec<Position>, MarketDataError> {
        if self.engine.free_slots() == 0 {
            tracing::info!(
                open = self.engine.open_count(),
                "Max positions reached, skipping scan"
            );
            return Ok(vec![]);
        }

        let started = Instant::now();
        let scanner = &self.settings.scanner;
        let tickers = self.market.tickers().await?;
        let universe = select_pairs(&tickers, scanner);
        if let Some(file) = &self.pairs_file {
            if let Err(e) = file.update(&universe, scanner.min_quote_volume) {
                tracing::warn!(error = %e, path = ?file.path(), "Failed to write pairs file");
            }
        }

        let candidates: Vec<String> = universe
            .into_iter()
            .take(scanner.max_pairs)
            .filter(|s| self.engine.position(s).is_none())
            .collect();
        tracing::info!(pairs = candidates.len(), "Scanning for entries");

        let market: &dyn MarketData = self.market.as_ref();
        let limit = self.settings.candle_limit;
        let histories: Vec<(String, Result<Vec<Candle>, MarketDataError>)> =
            stream::iter(candidates)
                .map(|symbol| async move {
                    let candles = market.candles(&symbol, limit).await;
                    (symbol, candles)
                })
                .buffered(scanner.fetch_concurrency.max(1))
                .collect()
                .await;

        let mut signals = Vec::new();
        for (symbol, candles) in histories {
            let candles = match candles {
                Ok(candles) => candles,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Failed to fetch candles");
                    continue;
                }
            };
            let features = compute_features(&candles, &self.settings.strategy);
            if !self.signal.should_enter(&features) {
                continue;
            }
            if let (Some(candle), Some(bar)) = (candles.last(), features.last()) {
                tracing::info!(symbol = %symbol, close = %candle.close, "Entry signal");
                signals.push((symbol, candle.close, bar.clone()));
            }
        }

        let mut opened = Vec::new();
        for (symbol, close, bar) in signals {
            if self.engine.free_slots() == 0 {
                tracing::info!(symbol = %symbol, "No free slots left for signal");
                break;
            }
            if let Some(position) = self.enter(&symbol, close, &bar) {
                opened.push(position);
            }
        }

        telemetry::record_latency(LatencyMetric::ScanCycle, started.elapsed());
        Ok(opened)
    }

    fn enter(&mut self, symbol: &str, close: Decimal, bar: &FeatureBar) -> Option<Position> {
        let Some(volatility) = bar.atr.and_then(|atr| Decimal::try_from(atr).ok()) else {
            tracing::warn!(symbol, "ATR unavailable, skipping entry");
            return None;
        };
        let params = self
            .calculator
            .compute(close, volatility.round_dp(8), self.engine.capital());
        if !params.is_tradable() {
            tracing::info!(symbol, atr = %params.volatility, "Zero risk distance, skipping entry");
            return None;
        }

        match self.engine.open(symbol, &params) {
            Ok(position) => Some(position),
            Err(OpenRejection::AlreadyOpen(_)) => None,
            Err(rejection) => {
                tracing::info!(symbol, reason = %rejection, "Entry refused");
                None
            }
        }
    }

    /// Monitor, then scan when the scan interval has elapsed
    ///
    /// A failed price fetch leaves positions unevaluated for this cycle but
    /// does not hold back a due scan. A failed scan is retried next cycle.
    pub async fn run_cycle(&mut self) -> anyhow::Result<CycleReport> {
        let mut report = CycleReport::default();
        match self.monitor().await {
            Ok(events) => report.events = events,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    open = self.engine.open_count(),
                    "No prices this cycle, open positions not evaluated"
                );
                telemetry::increment(CounterMetric::PriceFetchErrors);
            }
        }

        let due = self
            .last_scan
            .map_or(true, |t| t.elapsed() >= self.settings.scanner.scan_interval());
        if due {
            report.opened = self.scan().await?;
            report.scanned = true;
            self.last_scan = Some(Instant::now());
        }

        tracing::debug!(
            events = report.events.len(),
            opened = report.opened.len(),
            scanned = report.scanned,
            capital = %self.engine.capital(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Run cycles until Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// A failed cycle is logged and followed by the error back-off instead
    /// of the monitor interval.
    pub async fn run_until<F>(mut self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(
            capital = %self.engine.capital(),
            open = self.engine.open_count(),
            "Trading agent started"
        );

        loop {
            let pause = match self.run_cycle().await {
                Ok(_) => self.settings.scanner.monitor_interval(),
                Err(e) => {
                    tracing::error!(error = %e, "Cycle failed");
                    telemetry::increment(CounterMetric::CycleErrors);
                    self.settings.scanner.error_backoff()
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = &mut shutdown => {
                    tracing::info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        tracing::info!(capital = %self.engine.capital(), "Trading agent stopped");
        Ok(())
    }

    /// Flush pending notifications before the process exits
    pub async fn shutdown(&self) {
        self.engine.notifier().shutdown().await;
    }
}
