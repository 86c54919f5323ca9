//! Configuration file tests

use rust_decimal_macros::dec;
use trend_agent::config::{Config, LogFormat};

#[test]
fn test_example_config_parses() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();

    assert_eq!(config.exchange.interval, "240");
    assert_eq!(config.scanner.quote_asset, "USDT");
    assert_eq!(config.strategy.ema_long, 200);
    assert_eq!(config.risk.max_open_positions, 2);
    assert_eq!(config.risk.risk_fraction, dec!(0.01));
    assert_eq!(config.risk.tp_multiples, [dec!(1.0), dec!(1.5), dec!(2.0)]);
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    assert!(config.notifier.credentials().is_none());
}

#[test]
fn test_invalid_risk_rejected() {
    let toml = r#"
        [risk]
        max_open_positions = 2
        risk_fraction = 1.5
        initial_capital = 1000.0
    "#;
    let err = Config::from_toml(toml).unwrap_err();
    assert!(err.to_string().contains("risk_fraction"));
}

#[test]
fn test_effective_config_round_trips_through_toml() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed = Config::from_toml(&rendered).unwrap();
    assert_eq!(reparsed.risk.initial_capital, config.risk.initial_capital);
    assert_eq!(reparsed.storage.ledger_file, config.storage.ledger_file);
}
