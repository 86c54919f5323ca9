//! Agent cycles against a scripted market

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use trend_agent::agent::{AgentSettings, TradingAgent};
use trend_agent::config::Config;
use trend_agent::indicators::FeatureBar;
use trend_agent::ledger::CsvLedger;
use trend_agent::market::{Candle, MarketData, MarketDataError, Ticker};
use trend_agent::notify::LogNotifier;
use trend_agent::portfolio::{EngineConfig, JsonFileStore, PositionEngine, PriceSample};
use trend_agent::risk::TradeParamCalculator;
use trend_agent::signal::{EntryDecision, SignalEvaluator, SkipReason};

/// One symbol with a rising history and a settable last price
struct ScriptedMarket {
    price: Mutex<Decimal>,
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn tickers(&self) -> Result<Vec<Ticker>, MarketDataError> {
        Ok(vec![Ticker {
            symbol: "ETHUSDT".to_string(),
            last_price: dec!(3000),
            quote_volume: dec!(50000000),
        }])
    }

    async fn candles(&self, _symbol: &str, limit: usize) -> Result<Vec<Candle>, MarketDataError> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        Ok((0..limit.min(40) as i64)
            .map(|i| {
                let close = Decimal::from(2960 + i);
                Candle {
                    open_time: start + Duration::hours(4 * i),
                    open: close,
                    high: close + dec!(5),
                    low: close - dec!(5),
                    close,
                    volume: dec!(100),
                }
            })
            .collect())
    }

    async fn price_samples(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceSample>, MarketDataError> {
        let price = *self.price.lock().unwrap();
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), PriceSample::last(price)))
            .collect())
    }
}

/// Enters once the ATR is warm
struct WarmAtr;

impl SignalEvaluator for WarmAtr {
    fn evaluate(&self, bars: &[FeatureBar]) -> EntryDecision {
        match bars.last().and_then(|b| b.atr) {
            Some(_) => EntryDecision::Enter,
            None => EntryDecision::Skip(SkipReason::IndicatorsWarmingUp),
        }
    }
}

fn build(dir: &Path, market: Arc<ScriptedMarket>) -> TradingAgent {
    let mut config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    config.scanner.pairs_file = Some(dir.join("pairs.txt"));
    let engine = PositionEngine::new(
        EngineConfig::from(&config.risk),
        Box::new(JsonFileStore::new(dir.join("state.json"), config.risk.initial_capital)),
        Box::new(CsvLedger::new(dir.join("ledger.csv"))),
        Arc::new(LogNotifier::new()),
    );
    TradingAgent::new(
        engine,
        market,
        Box::new(WarmAtr),
        TradeParamCalculator::from_config(&config.risk),
        AgentSettings::from_config(&config),
    )
}

#[test]
fn test_agent_enters_then_stops_out_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let market = Arc::new(ScriptedMarket {
        price: Mutex::new(dec!(2999)),
    });

    let mut agent = build(dir.path(), Arc::clone(&market));
    let report = tokio_test::block_on(agent.run_cycle()).unwrap();
    assert!(report.scanned);
    assert_eq!(report.opened.len(), 1);

    // close 2999, true range 10 on every bar: ATR 10, stop 2979
    let position = &report.opened[0];
    assert_eq!(position.entry_price, dec!(2999));
    assert_eq!(position.stop_loss, dec!(2979));
    assert_eq!(position.size, dec!(0.5));

    let pairs = std::fs::read_to_string(dir.path().join("pairs.txt")).unwrap();
    assert!(pairs.lines().any(|l| l == "ETHUSDT"));
    drop(agent);

    *market.price.lock().unwrap() = dec!(2970);
    let mut restarted = build(dir.path(), market);
    assert_eq!(restarted.engine().open_count(), 1);

    let events = tokio_test::block_on(restarted.monitor()).unwrap();
    assert_eq!(events.len(), 1);
    // (2979 - 2999) * 0.5
    assert_eq!(restarted.engine().capital(), dec!(990));

    let ledger = std::fs::read_to_string(dir.path().join("ledger.csv")).unwrap();
    assert_eq!(ledger.lines().count(), 3);
    assert!(ledger.lines().last().unwrap().ends_with(",-10.00,stop-loss"));
}
