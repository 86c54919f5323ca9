//! Entry signal module
//!
//! Decides from a feature series whether a symbol should be entered now.

mod trend;

pub use trend::TrendSignal;

use serde::{Deserialize, Serialize};

use crate::indicators::FeatureBar;

/// Outcome of evaluating a feature series
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecision {
    /// Enter at the last close
    Enter,
    /// No entry
    Skip(SkipReason),
}

/// Why an entry was not signalled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Fewer bars than the long trend filter needs
    InsufficientHistory { have: usize, need: usize },
    /// An indicator on the last two bars has not warmed up
    IndicatorsWarmingUp,
    /// Close at or below the long EMA
    BelowTrend,
    /// Short EMA did not cross above the medium EMA on the last bar
    NoCrossover,
    /// MACD line at or below its signal line
    MomentumNotConfirmed,
}

/// Entry rule over computed features
pub trait SignalEvaluator: Send + Sync {
    /// Evaluate the series, oldest bar first
    fn evaluate(&self, bars: &[FeatureBar]) -> EntryDecision;

    fn should_enter(&self, bars: &[FeatureBar]) -> bool {
        matches!(self.evaluate(bars), EntryDecision::Enter)
    }
}
