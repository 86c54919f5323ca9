//! Portfolio types
//!
//! Open position records, the persisted portfolio snapshot and the events
//! the lifecycle engine reports back to its caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::risk::TradeParams;

/// A virtual long position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Trading symbol, unique among open positions
    pub symbol: String,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
    /// Entry price
    pub entry_price: Decimal,
    /// Size at open
    pub initial_size: Decimal,
    /// Remaining open quantity
    pub size: Decimal,
    /// Current stop (moves to breakeven after TP1)
    pub stop_loss: Decimal,
    pub tp1: Decimal,
    pub tp2: Decimal,
    pub tp3: Decimal,
    pub tp1_hit: bool,
    pub tp2_hit: bool,
    /// Label of the last event
    pub notes: String,
}

/// Lifecycle stage derived from the take-profit flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStage {
    OpenFull,
    Tp1Hit,
    Tp2Hit,
}

impl Position {
    /// Build a fresh position from trade parameters
    pub fn open(symbol: impl Into<String>, params: &TradeParams, entry_time: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            entry_time,
            entry_price: params.entry_price,
            initial_size: params.size,
            size: params.size,
            stop_loss: params.stop_loss,
            tp1: params.tp1,
            tp2: params.tp2,
            tp3: params.tp3,
            tp1_hit: false,
            tp2_hit: false,
            notes: "Open".to_string(),
        }
    }

    pub fn stage(&self) -> PositionStage {
        match (self.tp1_hit, self.tp2_hit) {
            (_, true) => PositionStage::Tp2Hit,
            (true, false) => PositionStage::Tp1Hit,
            (false, false) => PositionStage::OpenFull,
        }
    }

    /// Mark-to-market P&L of the remaining size
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.size
    }

    /// Check the record invariants, describing the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.symbol.is_empty() {
            return Err("empty symbol".to_string());
        }
        if self.initial_size <= Decimal::ZERO {
            return Err(format!("{}: non-positive initial size", self.symbol));
        }
        if self.size < Decimal::ZERO || self.size > self.initial_size {
            return Err(format!(
                "{}: size {} outside [0, {}]",
                self.symbol, self.size, self.initial_size
            ));
        }
        if !(self.entry_price < self.tp1 && self.tp1 < self.tp2 && self.tp2 < self.tp3) {
            return Err(format!("{}: take-profit levels out of order", self.symbol));
        }
        if self.tp2_hit && !self.tp1_hit {
            return Err(format!("{}: tp2 hit before tp1", self.symbol));
        }
        Ok(())
    }
}

/// Virtual account state, persisted after every mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub capital: Decimal,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl PortfolioState {
    /// Cold-start state: full capital, nothing open
    pub fn fresh(capital: Decimal) -> Self {
        Self {
            capital,
            positions: vec![],
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.symbol.clone()).collect()
    }

    /// Validate every position and symbol uniqueness
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for position in &self.positions {
            position.check_invariants()?;
            if !seen.insert(position.symbol.as_str()) {
                return Err(format!("duplicate open position for {}", position.symbol));
            }
        }
        Ok(())
    }
}

/// A price observation for one symbol
///
/// When the window extremes are unknown the last price stands in for both,
/// so stale extremes can never trigger an exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub price: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
}

impl PriceSample {
    /// Sample carrying only the last traded price
    pub fn last(price: Decimal) -> Self {
        Self {
            price,
            high: None,
            low: None,
        }
    }

    /// Sample carrying the extremes of the inspection window
    pub fn with_range(price: Decimal, high: Decimal, low: Decimal) -> Self {
        Self {
            price,
            high: Some(high),
            low: Some(low),
        }
    }

    pub fn high(&self) -> Decimal {
        self.high.unwrap_or(self.price)
    }

    pub fn low(&self) -> Decimal {
        self.low.unwrap_or(self.price)
    }
}

/// Take-profit stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TpLevel {
    Tp1,
    Tp2,
    Tp3,
}

impl TpLevel {
    pub fn number(&self) -> u8 {
        match self {
            TpLevel::Tp1 => 1,
            TpLevel::Tp2 => 2,
            TpLevel::Tp3 => 3,
        }
    }
}

impl fmt::Display for TpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TP{}", self.number())
    }
}

/// Why a position left the open set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Low crossed the stop (initial or breakeven)
    StopLoss,
    /// Remaining size sold at TP3
    FullTakeProfit,
    /// Any other close, e.g. operator initiated
    Other(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => f.write_str("Stop Loss"),
            ExitReason::FullTakeProfit => f.write_str("TP3 Full Exit"),
            ExitReason::Other(reason) => f.write_str(reason),
        }
    }
}

/// State transition reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    /// Partial exit at TP1 or TP2
    PartialExit {
        symbol: String,
        level: TpLevel,
        price: Decimal,
        exited: Decimal,
        remaining: Decimal,
        realized_pnl: Decimal,
    },
    /// Position removed from the open set
    Closed {
        symbol: String,
        reason: ExitReason,
        price: Decimal,
        exited: Decimal,
        realized_pnl: Decimal,
    },
}

impl PositionEvent {
    pub fn symbol(&self) -> &str {
        match self {
            PositionEvent::PartialExit { symbol, .. } | PositionEvent::Closed { symbol, .. } => {
                symbol
            }
        }
    }

    pub fn realized_pnl(&self) -> Decimal {
        match self {
            PositionEvent::PartialExit { realized_pnl, .. }
            | PositionEvent::Closed { realized_pnl, .. } => *realized_pnl,
        }
    }

    pub fn is_close(&self) -> bool {
        matches!(self, PositionEvent::Closed { .. })
    }
}
