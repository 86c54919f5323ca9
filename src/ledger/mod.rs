//! Trade ledger module
//!
//! Append-only audit trail of every entry, partial exit and close.

mod csv;

pub use self::csv::CsvLedger;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

use crate::portfolio::Position;

/// Ledger write errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Trade side; only long entries exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
        }
    }
}

/// Event kind recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    Entry,
    Tp1Hit,
    Tp2Hit,
    Tp3FullExit,
    StopLoss,
    Closed(String),
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStatus::Entry => f.write_str("entry"),
            LedgerStatus::Tp1Hit => f.write_str("tp1-hit"),
            LedgerStatus::Tp2Hit => f.write_str("tp2-hit"),
            LedgerStatus::Tp3FullExit => f.write_str("tp3-full-exit"),
            LedgerStatus::StopLoss => f.write_str("stop-loss"),
            LedgerStatus::Closed(reason) => f.write_str(reason),
        }
    }
}

/// One ledger row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    /// Remaining size for entries and partial exits, exited size for closes
    pub size: Decimal,
    pub stop_loss: Decimal,
    pub tp1: Decimal,
    pub tp2: Decimal,
    pub tp3: Decimal,
    /// Realized P&L of this event, zero for entries
    pub realized_pnl: Decimal,
    pub status: LedgerStatus,
}

impl LedgerEntry {
    /// Snapshot a position's levels into a ledger row
    pub fn from_position(
        position: &Position,
        size: Decimal,
        realized_pnl: Decimal,
        status: LedgerStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            symbol: position.symbol.clone(),
            side: Side::Buy,
            entry_price: position.entry_price,
            size,
            stop_loss: position.stop_loss,
            tp1: position.tp1,
            tp2: position.tp2,
            tp3: position.tp3,
            realized_pnl,
            status,
        }
    }
}

/// Render `value` with exactly `dp` decimal places, rounding half away from zero
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Append-only sink for ledger rows
pub trait TradeLedger: Send + Sync {
    /// Append one row
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError>;
}

/// Ledger kept in memory, used for dry runs and tests
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TradeLedger for MemoryLedger {
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.entries
            .lock()
            .map_err(|_| LedgerError::Unavailable("memory ledger poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }
}
