//! Configuration types for trend-agent

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the Telegram bot token
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the Telegram chat id
pub const TELEGRAM_CHAT_ENV: &str = "TELEGRAM_CHAT_ID";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_open_positions must be at least 1")]
    NoPositionCapacity,
    #[error("risk_fraction must be in (0, 1), got {0}")]
    RiskFractionOutOfRange(Decimal),
    #[error("stop_multiplier must be positive, got {0}")]
    NonPositiveStopMultiplier(Decimal),
    #[error("initial_capital must be positive, got {0}")]
    NonPositiveCapital(Decimal),
    #[error("take-profit multiples must be positive and strictly increasing: {0:?}")]
    TakeProfitSchedule([Decimal; 3]),
    #[error("partial exit fractions must be in (0, 1) and sum below 1: tp1={0}, tp2={1}")]
    ExitFractions(Decimal, Decimal),
    #[error("{0} interval must be non-zero")]
    ZeroInterval(&'static str),
}

/// Exchange REST configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// REST base URL
    pub base_url: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
    /// Market category ("spot" or "linear")
    pub category: String,
    /// Candle interval as understood by the exchange ("240" = 4h)
    pub interval: String,
    /// Number of candles fetched per symbol
    pub candle_limit: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bybit.com".to_string(),
            timeout_secs: 10,
            category: "spot".to_string(),
            interval: "240".to_string(),
            candle_limit: 250,
        }
    }
}

/// Universe discovery and loop cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Quote asset pairs must be denominated in
    pub quote_asset: String,
    /// Minimum 24h quote volume for a pair to be considered
    pub min_quote_volume: Decimal,
    /// Base assets never traded
    pub excluded_bases: Vec<String>,
    /// Maximum pairs analysed per scan
    pub max_pairs: usize,
    /// Seconds between candidate scans
    pub scan_interval_secs: u64,
    /// Seconds between position checks
    pub monitor_interval_secs: u64,
    /// Pause after an unexpected cycle failure (seconds)
    pub error_backoff_secs: u64,
    /// Maximum concurrent candle requests during a scan
    pub fetch_concurrency: usize,
    /// File the current pair universe is written to
    pub pairs_file: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            min_quote_volume: dec!(1000000),
            excluded_bases: [
                "USDC", "USDE", "DAI", "BUSD", "TUSD", "USDT", "FDUSD", "USDP", "GUSD", "STABLE",
                "XAUT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_pairs: 30,
            scan_interval_secs: 300,
            monitor_interval_secs: 180,
            error_backoff_secs: 60,
            fetch_concurrency: 4,
            pairs_file: Some(PathBuf::from("logs/trading_pairs.txt")),
        }
    }
}

impl ScannerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// Indicator periods used by the entry signal
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub ema_long: usize,
    pub ema_medium: usize,
    pub ema_short: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ema_long: 200,
            ema_medium: 55,
            ema_short: 10,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
        }
    }
}

/// Risk and position management configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Maximum concurrently open positions
    pub max_open_positions: usize,
    /// Fraction of capital risked per trade
    pub risk_fraction: Decimal,
    /// Stop distance in multiples of the volatility measure
    #[serde(default = "default_stop_multiplier")]
    pub stop_multiplier: Decimal,
    /// Starting virtual capital
    pub initial_capital: Decimal,
    /// TP1/TP2/TP3 distances in multiples of the risk distance
    #[serde(default = "default_tp_multiples")]
    pub tp_multiples: [Decimal; 3],
    /// Fraction of the initial size sold at TP1
    #[serde(default = "default_exit_fraction")]
    pub tp1_exit_fraction: Decimal,
    /// Fraction of the initial size sold at TP2
    #[serde(default = "default_exit_fraction")]
    pub tp2_exit_fraction: Decimal,
}

fn default_stop_multiplier() -> Decimal {
    dec!(2.0)
}
fn default_tp_multiples() -> [Decimal; 3] {
    [dec!(1.0), dec!(1.5), dec!(2.0)]
}
fn default_exit_fraction() -> Decimal {
    dec!(0.33)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_open_positions: 2,
            risk_fraction: dec!(0.01),
            stop_multiplier: default_stop_multiplier(),
            initial_capital: dec!(1000),
            tp_multiples: default_tp_multiples(),
            tp1_exit_fraction: default_exit_fraction(),
            tp2_exit_fraction: default_exit_fraction(),
        }
    }
}

impl RiskConfig {
    /// Check the ranges every risk option must satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_positions == 0 {
            return Err(ConfigError::NoPositionCapacity);
        }
        if self.risk_fraction <= Decimal::ZERO || self.risk_fraction >= Decimal::ONE {
            return Err(ConfigError::RiskFractionOutOfRange(self.risk_fraction));
        }
        if self.stop_multiplier <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveStopMultiplier(self.stop_multiplier));
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        let [m1, m2, m3] = self.tp_multiples;
        if m1 <= Decimal::ZERO || m1 >= m2 || m2 >= m3 {
            return Err(ConfigError::TakeProfitSchedule(self.tp_multiples));
        }
        let in_unit = |f: Decimal| f > Decimal::ZERO && f < Decimal::ONE;
        if !in_unit(self.tp1_exit_fraction)
            || !in_unit(self.tp2_exit_fraction)
            || self.tp1_exit_fraction + self.tp2_exit_fraction >= Decimal::ONE
        {
            return Err(ConfigError::ExitFractions(
                self.tp1_exit_fraction,
                self.tp2_exit_fraction,
            ));
        }
        Ok(())
    }
}

/// Durable state locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Portfolio snapshot (JSON)
    pub state_file: PathBuf,
    /// Append-only trade ledger (CSV)
    pub ledger_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("trade_params.json"),
            ledger_file: PathBuf::from("logs/trade_history.csv"),
        }
    }
}

/// Outbound notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub api_url: String,
    pub timeout_secs: u64,
    /// Resolved from the environment, never read from the file
    #[serde(skip)]
    pub bot_token: Option<String>,
    #[serde(skip)]
    pub chat_id: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
            bot_token: None,
            chat_id: None,
        }
    }
}

impl NotifierConfig {
    /// Token and chat id, when both are present and notifications are on
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.enabled {
            return None;
        }
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token, chat))
            }
            _ => None,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter port; metrics are not exported when unset
    pub metrics_port: Option<u16>,
    /// Log file, rotated daily next to its configured name; console only when unset
    pub log_file: Option<PathBuf>,
    /// Rotated log files kept
    pub log_files_kept: usize,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
            log_file: Some(PathBuf::from("logs/trend-agent.log")),
            log_files_kept: 5,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        if self.scanner.scan_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("scan"));
        }
        if self.scanner.monitor_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("monitor"));
        }
        Ok(())
    }

    /// Pull credentials from the process environment
    pub fn apply_env(&mut self) {
        self.notifier.bot_token = std::env::var(TELEGRAM_TOKEN_ENV).ok();
        self.notifier.chat_id = std::env::var(TELEGRAM_CHAT_ENV).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [risk]
        max_open_positions = 2
        risk_fraction = 0.01
        initial_capital = 1000.0
    "#;

    #[test]
    fn test_config_minimal_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.risk.max_open_positions, 2);
        assert_eq!(config.risk.stop_multiplier, dec!(2.0));
        assert_eq!(config.risk.tp_multiples, [dec!(1.0), dec!(1.5), dec!(2.0)]);
        assert_eq!(config.risk.tp1_exit_fraction, dec!(0.33));
        assert_eq!(config.strategy.ema_long, 200);
        assert_eq!(config.exchange.candle_limit, 250);
        assert_eq!(config.scanner.scan_interval_secs, 300);
        assert_eq!(config.storage.state_file, PathBuf::from("trade_params.json"));
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
        assert!(config.telemetry.metrics_port.is_none());
        assert_eq!(
            config.telemetry.log_file,
            Some(PathBuf::from("logs/trend-agent.log"))
        );
        assert_eq!(config.telemetry.log_files_kept, 5);
    }

    #[test]
    fn test_config_full_sections() {
        let toml = r#"
            [exchange]
            base_url = "https://api-testnet.bybit.com"
            category = "linear"

            [scanner]
            min_quote_volume = 5000000
            max_pairs = 10

            [strategy]
            atr_period = 21

            [risk]
            max_open_positions = 3
            risk_fraction = 0.02
            stop_multiplier = 1.5
            initial_capital = 500
            tp_multiples = [1.0, 2.0, 3.0]

            [storage]
            state_file = "/tmp/state.json"

            [telemetry]
            log_format = "json"
            metrics_port = 9100
            log_file = "/var/log/trend/agent.log"
            log_files_kept = 14
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.exchange.category, "linear");
        assert_eq!(config.exchange.interval, "240");
        assert_eq!(config.scanner.min_quote_volume, dec!(5000000));
        assert_eq!(config.scanner.quote_asset, "USDT");
        assert_eq!(config.strategy.atr_period, 21);
        assert_eq!(config.strategy.ema_short, 10);
        assert_eq!(config.risk.tp_multiples[2], dec!(3.0));
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9100));
        assert_eq!(
            config.telemetry.log_file,
            Some(PathBuf::from("/var/log/trend/agent.log"))
        );
        assert_eq!(config.telemetry.log_files_kept, 14);
    }

    #[test]
    fn test_config_missing_risk_section() {
        assert!(Config::from_toml("[scanner]\nmax_pairs = 5\n").is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_risk_validation() {
        assert!(RiskConfig::default().validate().is_ok());

        let zero_cap = RiskConfig {
            max_open_positions: 0,
            ..RiskConfig::default()
        };
        assert_eq!(zero_cap.validate(), Err(ConfigError::NoPositionCapacity));

        let big_risk = RiskConfig {
            risk_fraction: dec!(1),
            ..RiskConfig::default()
        };
        assert_eq!(
            big_risk.validate(),
            Err(ConfigError::RiskFractionOutOfRange(dec!(1)))
        );

        let bad_schedule = RiskConfig {
            tp_multiples: [dec!(1.5), dec!(1.5), dec!(2.0)],
            ..RiskConfig::default()
        };
        assert!(matches!(
            bad_schedule.validate(),
            Err(ConfigError::TakeProfitSchedule(_))
        ));

        let oversold = RiskConfig {
            tp1_exit_fraction: dec!(0.5),
            tp2_exit_fraction: dec!(0.5),
            ..RiskConfig::default()
        };
        assert!(matches!(
            oversold.validate(),
            Err(ConfigError::ExitFractions(_, _))
        ));

        let no_capital = RiskConfig {
            initial_capital: dec!(0),
            ..RiskConfig::default()
        };
        assert!(no_capital.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let toml = format!("{}\n[scanner]\nmonitor_interval_secs = 0\n", MINIMAL);
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_notifier_credentials() {
        let mut notifier = NotifierConfig::default();
        assert!(notifier.credentials().is_none());

        notifier.bot_token = Some("token".to_string());
        notifier.chat_id = Some(String::new());
        assert!(notifier.credentials().is_none());

        notifier.chat_id = Some("42".to_string());
        assert_eq!(notifier.credentials(), Some(("token", "42")));

        notifier.enabled = false;
        assert!(notifier.credentials().is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../config.toml.example")).unwrap();
        assert_eq!(config.risk.max_open_positions, 2);
        assert_eq!(config.risk.initial_capital, dec!(1000));
    }
}
