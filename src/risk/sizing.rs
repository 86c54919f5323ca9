//! Position sizing
//!
//! Sizes a long position so that a stop-out loses a fixed fraction of
//! capital: `quantity = capital * risk_fraction / (entry - stop)`.

use rust_decimal::Decimal;

use crate::config::RiskConfig;

/// Quantity that risks `risk_fraction` of `capital` between entry and stop
///
/// Returns zero when `entry_price <= stop_price`: there is no valid long
/// risk distance and the caller must not trade.
pub fn position_size(
    capital: Decimal,
    risk_fraction: Decimal,
    entry_price: Decimal,
    stop_price: Decimal,
) -> Decimal {
    if entry_price <= stop_price {
        return Decimal::ZERO;
    }
    let risk_amount = capital * risk_fraction;
    risk_amount / (entry_price - stop_price)
}

/// Fixed-fractional risk sizer
#[derive(Debug, Clone)]
pub struct RiskSizer {
    /// Fraction of capital risked per trade (e.g., 0.01 = 1%)
    pub risk_fraction: Decimal,
}

impl RiskSizer {
    /// Create a new sizer
    pub fn new(risk_fraction: Decimal) -> Self {
        Self { risk_fraction }
    }

    /// Create from RiskConfig
    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(config.risk_fraction)
    }

    /// Calculate position size for the given capital and price levels
    pub fn size(&self, capital: Decimal, entry_price: Decimal, stop_price: Decimal) -> Decimal {
        position_size(capital, self.risk_fraction, entry_price, stop_price)
    }
}
