//! Technical indicators
//!
//! Turns a candle series into a fixed per-bar feature record consumed by
//! the entry signal. Values are `None` until their indicator has warmed up.

mod atr;
mod ema;
mod macd;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::Macd;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::config::StrategyConfig;
use crate::market::Candle;

/// Indicator values for one bar
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBar {
    pub open_time: DateTime<Utc>,
    pub close: f64,
    pub ema_long: Option<f64>,
    pub ema_medium: Option<f64>,
    pub ema_short: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub atr: Option<f64>,
}

/// Compute features for every candle, oldest first
pub fn compute_features(candles: &[Candle], config: &StrategyConfig) -> Vec<FeatureBar> {
    let mut ema_long = Ema::new(config.ema_long);
    let mut ema_medium = Ema::new(config.ema_medium);
    let mut ema_short = Ema::new(config.ema_short);
    let mut macd = Macd::new(config.macd_fast, config.macd_slow, config.macd_signal);
    let mut atr = Atr::new(config.atr_period);

    candles
        .iter()
        .map(|c| {
            let close = c.close.to_f64().unwrap_or_default();
            let high = c.high.to_f64().unwrap_or_default();
            let low = c.low.to_f64().unwrap_or_default();
            let (macd_line, macd_signal) = macd.update(close);

            FeatureBar {
                open_time: c.open_time,
                close,
                ema_long: ema_long.update(close),
                ema_medium: ema_medium.update(close),
                ema_short: ema_short.update(close),
                macd: macd_line,
                macd_signal,
                atr: atr.update(high, low, close),
            }
        })
        .collect()
}
