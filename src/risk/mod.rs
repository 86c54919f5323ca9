//! Risk management module
//!
//! Fixed-fractional position sizing and the stop / take-profit ladder
//! derived from a volatility measure.

mod params;
mod sizing;

pub use params::{TradeParamCalculator, TradeParams};
pub use sizing::{position_size, RiskSizer};
