//! EMA crossover trend entry

use super::{EntryDecision, SignalEvaluator, SkipReason};
use crate::config::StrategyConfig;
use crate::indicators::FeatureBar;

/// Long-only trend entry
///
/// Enters when the close is above the long EMA, the short EMA crosses above
/// the medium EMA on the last bar, and MACD is above its signal line.
#[derive(Debug, Clone)]
pub struct TrendSignal {
    min_bars: usize,
}

impl TrendSignal {
    pub fn new(min_bars: usize) -> Self {
        Self {
            min_bars: min_bars.max(2),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new(config.ema_long)
    }
}

impl SignalEvaluator for TrendSignal {
    fn evaluate(&self, bars: &[FeatureBar]) -> EntryDecision {
        if bars.len() < self.min_bars {
            return EntryDecision::Skip(SkipReason::InsufficientHistory {
                have: bars.len(),
                need: self.min_bars,
            });
        }
        let (prev, last) = match bars {
            [.., prev, last] => (prev, last),
            _ => {
                return EntryDecision::Skip(SkipReason::InsufficientHistory {
                    have: bars.len(),
                    need: self.min_bars,
                })
            }
        };

        let (Some(ema_long), Some(short), Some(medium), Some(prev_short), Some(prev_medium)) = (
            last.ema_long,
            last.ema_short,
            last.ema_medium,
            prev.ema_short,
            prev.ema_medium,
        ) else {
            return EntryDecision::Skip(SkipReason::IndicatorsWarmingUp);
        };
        let (Some(macd), Some(macd_signal)) = (last.macd, last.macd_signal) else {
            return EntryDecision::Skip(SkipReason::IndicatorsWarmingUp);
        };

        if last.close <= ema_long {
            return EntryDecision::Skip(SkipReason::BelowTrend);
        }
        if !(prev_short <= prev_medium && short > medium) {
            return EntryDecision::Skip(SkipReason::NoCrossover);
        }
        if macd <= macd_signal {
            return EntryDecision::Skip(SkipReason::MomentumNotConfirmed);
        }
        EntryDecision::Enter
    }
}
