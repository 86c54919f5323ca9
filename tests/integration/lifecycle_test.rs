//! Position lifecycle against the on-disk store and ledger

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use trend_agent::ledger::CsvLedger;
use trend_agent::notify::LogNotifier;
use trend_agent::portfolio::{
    EngineConfig, JsonFileStore, PositionEngine, PositionEvent, PositionStage, PositionStore,
    PriceSample,
};
use trend_agent::config::RiskConfig;
use trend_agent::risk::TradeParamCalculator;

fn engine(dir: &Path) -> PositionEngine {
    PositionEngine::new(
        EngineConfig::default(),
        Box::new(JsonFileStore::new(dir.join("trade_params.json"), dec!(1000))),
        Box::new(CsvLedger::new(dir.join("logs").join("trade_history.csv"))),
        Arc::new(LogNotifier::new()),
    )
}

fn open_reference(engine: &mut PositionEngine) {
    let calc = TradeParamCalculator::from_config(&RiskConfig::default());
    let params = calc.compute(dec!(100), dec!(5), engine.capital());
    assert_eq!(params.size, dec!(1));
    engine.open("BTCUSDT", &params).unwrap();
}

fn ledger_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("logs").join("trade_history.csv"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_full_take_profit_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut live = engine(dir.path());
    open_reference(&mut live);

    for price in [dec!(110), dec!(115), dec!(120)] {
        let events = live.evaluate("BTCUSDT", &PriceSample::last(price));
        assert_eq!(events.len(), 1);
    }

    // 0.33 * 10 + 0.33 * 15 + 0.34 * 20
    assert_eq!(live.capital(), dec!(1015.05));
    assert_eq!(live.open_count(), 0);

    let lines = ledger_lines(dir.path());
    assert_eq!(lines.len(), 5);
    assert!(lines[1].ends_with(",0.00,entry"));
    assert!(lines[2].ends_with(",3.30,tp1-hit"));
    assert!(lines[3].ends_with(",4.95,tp2-hit"));
    assert!(lines[4].ends_with(",6.80,tp3-full-exit"));

    let restarted = engine(dir.path());
    assert_eq!(restarted.capital(), dec!(1015.05));
    assert!(restarted.positions().is_empty());
}

#[test]
fn test_restart_mid_lifecycle_keeps_breakeven_stop() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut first = engine(dir.path());
        open_reference(&mut first);
        first.evaluate("BTCUSDT", &PriceSample::last(dec!(111)));
        assert_eq!(first.capital(), dec!(1003.3));
    }

    let mut second = engine(dir.path());
    let position = second.position("BTCUSDT").unwrap().clone();
    assert_eq!(position.stage(), PositionStage::Tp1Hit);
    assert_eq!(position.stop_loss, dec!(100));
    assert_eq!(position.size, dec!(0.67));

    let events = second.evaluate("BTCUSDT", &PriceSample::last(dec!(99)));
    match events.as_slice() {
        [PositionEvent::Closed { realized_pnl, exited, .. }] => {
            assert_eq!(*realized_pnl, Decimal::ZERO);
            assert_eq!(*exited, dec!(0.67));
        }
        other => panic!("unexpected events {:?}", other),
    }
    assert_eq!(second.capital(), dec!(1003.3));

    let snapshot = JsonFileStore::new(dir.path().join("trade_params.json"), dec!(1000)).load();
    assert_eq!(snapshot.capital, dec!(1003.3));
    assert!(snapshot.positions.is_empty());

    let lines = ledger_lines(dir.path());
    assert_eq!(lines.len(), 4);
    assert!(lines[3].contains(",0.6700,"));
    assert!(lines[3].ends_with(",0.00,stop-loss"));
}

#[test]
fn test_corrupt_snapshot_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("trade_params.json"), "{ not json").unwrap();

    let fresh = engine(dir.path());
    assert_eq!(fresh.capital(), dec!(1000));
    assert_eq!(fresh.open_count(), 0);
}
