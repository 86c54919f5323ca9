//! Trade parameter calculation
//!
//! Stop-loss sits `stop_multiplier` volatility units below entry; the three
//! take-profits sit at configured multiples of that risk distance above it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RiskSizer;
use crate::config::RiskConfig;

/// Levels and size for a prospective long entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeParams {
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub tp1: Decimal,
    pub tp2: Decimal,
    pub tp3: Decimal,
    pub size: Decimal,
    /// Volatility measure the levels were derived from
    pub volatility: Decimal,
}

impl TradeParams {
    /// Distance between entry and stop
    pub fn risk_distance(&self) -> Decimal {
        self.entry_price - self.stop_loss
    }

    /// A positive size is the only acceptance criterion
    pub fn is_tradable(&self) -> bool {
        self.size > Decimal::ZERO
    }
}

/// Derives stop, take-profits and size from entry and volatility
#[derive(Debug, Clone)]
pub struct TradeParamCalculator {
    sizer: RiskSizer,
    stop_multiplier: Decimal,
    tp_multiples: [Decimal; 3],
}

impl TradeParamCalculator {
    /// Create from RiskConfig
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            sizer: RiskSizer::from_config(config),
            stop_multiplier: config.stop_multiplier,
            tp_multiples: config.tp_multiples,
        }
    }

    /// Compute levels and size
    ///
    /// A zero volatility measure yields a zero size; callers treat
    /// `size <= 0` as "do not open".
    pub fn compute(&self, entry_price: Decimal, volatility: Decimal, capital: Decimal) -> TradeParams {
        let stop_loss = entry_price - volatility * self.stop_multiplier;
        let risk_distance = entry_price - stop_loss;
        let [m1, m2, m3] = self.tp_multiples;

        TradeParams {
            entry_price,
            stop_loss,
            tp1: entry_price + risk_distance * m1,
            tp2: entry_price + risk_distance * m2,
            tp3: entry_price + risk_distance * m3,
            size: self.sizer.size(capital, entry_price, stop_loss),
            volatility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_compute_reference_scenario() {
        let calc = TradeParamCalculator::from_config(&RiskConfig::default());
        let params = calc.compute(dec!(100), dec!(5), dec!(1000));

        assert_eq!(params.stop_loss, dec!(90));
        assert_eq!(params.risk_distance(), dec!(10));
        assert_eq!(params.tp1, dec!(110));
        assert_eq!(params.tp2, dec!(115));
        assert_eq!(params.tp3, dec!(120));
        assert_eq!(params.size, dec!(1));
        assert!(params.is_tradable());
    }

    #[test]
    fn test_compute_levels_are_ordered() {
        let calc = TradeParamCalculator::from_config(&RiskConfig::default());
        for (entry, vol) in [
            (dec!(0.0421), dec!(0.0013)),
            (dec!(64000), dec!(850)),
            (dec!(1.5), dec!(0.2)),
        ] {
            let p = calc.compute(entry, vol, dec!(1000));
            assert!(p.stop_loss < p.entry_price);
            assert!(p.entry_price < p.tp1);
            assert!(p.tp1 < p.tp2);
            assert!(p.tp2 < p.tp3);
        }
    }

    #[test]
    fn test_zero_volatility_rejected() {
        let calc = TradeParamCalculator::from_config(&RiskConfig::default());
        let params = calc.compute(dec!(100), dec!(0), dec!(1000));
        assert_eq!(params.size, Decimal::ZERO);
        assert!(!params.is_tradable());
    }

    #[test]
    fn test_custom_schedule() {
        let config = RiskConfig {
            stop_multiplier: dec!(1.5),
            tp_multiples: [dec!(1), dec!(2), dec!(3)],
            risk_fraction: dec!(0.02),
            ..RiskConfig::default()
        };
        let calc = TradeParamCalculator::from_config(&config);
        let params = calc.compute(dec!(50), dec!(2), dec!(600));

        // stop = 50 - 3 = 47; R = 3
        assert_eq!(params.stop_loss, dec!(47));
        assert_eq!(params.tp1, dec!(53));
        assert_eq!(params.tp2, dec!(56));
        assert_eq!(params.tp3, dec!(59));
        // 600 * 0.02 / 3 = 4
        assert_eq!(params.size, dec!(4));
    }
}
