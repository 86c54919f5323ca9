//! Position lifecycle engine
//!
//! Owns the portfolio state and drives each position through
//! `OpenFull -> Tp1Hit -> Tp2Hit -> closed`, with a stop-loss exit possible
//! from every open stage. Every mutation of capital or of the open set is
//! persisted before the operation returns; ledger and notification failures
//! are logged and never undo a committed transition.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::{ExitReason, PortfolioState, Position, PositionEvent, PositionStore, PriceSample, TpLevel};
use crate::config::RiskConfig;
use crate::ledger::{LedgerEntry, LedgerStatus, TradeLedger};
use crate::notify::{Notification, Notifier};
use crate::risk::TradeParams;
use crate::telemetry::{self, CounterMetric, GaugeMetric};

/// Engine limits and exit schedule
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrently open positions
    pub max_open_positions: usize,
    /// Fraction of the initial size sold at TP1
    pub tp1_exit_fraction: Decimal,
    /// Fraction of the initial size sold at TP2
    pub tp2_exit_fraction: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_open_positions: 2,
            tp1_exit_fraction: dec!(0.33),
            tp2_exit_fraction: dec!(0.33),
        }
    }
}

impl From<&RiskConfig> for EngineConfig {
    fn from(config: &RiskConfig) -> Self {
        Self {
            max_open_positions: config.max_open_positions,
            tp1_exit_fraction: config.tp1_exit_fraction,
            tp2_exit_fraction: config.tp2_exit_fraction,
        }
    }
}

/// Reasons an entry is refused; none of them is a failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenRejection {
    #[error("maximum open positions reached ({open}/{max})")]
    CapacityReached { open: usize, max: usize },
    #[error("position already open for {0}")]
    AlreadyOpen(String),
    #[error("computed size {0} is not positive")]
    NonPositiveSize(Decimal),
}

/// Position lifecycle state machine
pub struct PositionEngine {
    config: EngineConfig,
    state: PortfolioState,
    store: Box<dyn PositionStore>,
    ledger: Box<dyn TradeLedger>,
    notifier: Arc<dyn Notifier>,
}

impl PositionEngine {
    /// Create an engine, restoring state from `store`
    pub fn new(
        config: EngineConfig,
        store: Box<dyn PositionStore>,
        ledger: Box<dyn TradeLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = store.load();
        let engine = Self {
            config,
            state,
            store,
            ledger,
            notifier,
        };
        engine.publish_gauges();
        engine
    }

    pub fn capital(&self) -> Decimal {
        self.state.capital
    }

    pub fn positions(&self) -> &[Position] {
        &self.state.positions
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.state.position(symbol)
    }

    pub fn open_count(&self) -> usize {
        self.state.open_count()
    }

    /// Shared handle to the notification channel
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Number of positions that may still be opened
    pub fn free_slots(&self) -> usize {
        self.config
            .max_open_positions
            .saturating_sub(self.state.open_count())
    }

    /// Open a virtual position at `params.entry_price`
    pub fn open(&mut self, symbol: &str, params: &TradeParams) -> Result<Position, OpenRejection> {
        let open = self.state.open_count();
        if open >= self.config.max_open_positions {
            tracing::info!(symbol, open, "Max positions reached, skipping new trade");
            telemetry::increment(CounterMetric::OpenRejections);
            return Err(OpenRejection::CapacityReached {
                open,
                max: self.config.max_open_positions,
            });
        }
        if self.state.position(symbol).is_some() {
            telemetry::increment(CounterMetric::OpenRejections);
            return Err(OpenRejection::AlreadyOpen(symbol.to_string()));
        }
        if params.size <= Decimal::ZERO {
            tracing::info!(symbol, size = %params.size, "Non-positive size, skipping new trade");
            telemetry::increment(CounterMetric::OpenRejections);
            return Err(OpenRejection::NonPositiveSize(params.size));
        }

        let now = Utc::now();
        let position = Position::open(symbol, params, now);
        self.state.positions.push(position.clone());
        self.persist();
        self.record(LedgerEntry::from_position(
            &position,
            position.size,
            Decimal::ZERO,
            LedgerStatus::Entry,
            now,
        ));
        self.notifier.notify(Notification::Entry(position.clone()));

        tracing::info!(
            symbol,
            entry_price = %position.entry_price,
            size = %position.size,
            stop_loss = %position.stop_loss,
            tp1 = %position.tp1,
            tp2 = %position.tp2,
            tp3 = %position.tp3,
            "Opened position"
        );
        telemetry::increment(CounterMetric::PositionsOpened);
        self.publish_gauges();
        Ok(position)
    }

    /// Evaluate every open position that has a sample
    ///
    /// Symbols without a sample are skipped for this cycle.
    pub fn evaluate_all(&mut self, samples: &HashMap<String, PriceSample>) -> Vec<PositionEvent> {
        let mut events = Vec::new();
        for symbol in self.state.symbols() {
            match samples.get(&symbol) {
                Some(sample) => events.extend(self.evaluate(&symbol, sample)),
                None => tracing::debug!(symbol = %symbol, "No price sample this cycle"),
            }
        }
        events
    }

    /// Check one position against a price sample
    ///
    /// Stop-loss is checked first and ends the evaluation. Otherwise TP1,
    /// TP2 and TP3 are checked in order and several may fire in one call
    /// when price gapped through them.
    pub fn evaluate(&mut self, symbol: &str, sample: &PriceSample) -> Vec<PositionEvent> {
        let Some(position) = self.state.position(symbol) else {
            return vec![];
        };
        let high = sample.high();
        let low = sample.low();

        if low <= position.stop_loss {
            let stop = position.stop_loss;
            return self
                .close(symbol, stop, ExitReason::StopLoss, None)
                .into_iter()
                .collect();
        }

        let mut events = Vec::new();

        if let Some(p) = self.state.position(symbol) {
            if !p.tp1_hit && high >= p.tp1 {
                events.extend(self.take_partial(symbol, TpLevel::Tp1));
            }
        }

        if let Some(p) = self.state.position(symbol) {
            if p.tp1_hit && !p.tp2_hit && high >= p.tp2 {
                events.extend(self.take_partial(symbol, TpLevel::Tp2));
            }
        }

        if let Some(p) = self.state.position(symbol) {
            if p.tp2_hit && high >= p.tp3 {
                let (tp3, pnl) = (p.tp3, (p.tp3 - p.entry_price) * p.size);
                events.extend(self.close(symbol, tp3, ExitReason::FullTakeProfit, Some(pnl)));
            }
        }

        events
    }

    /// Sell the TP1 or TP2 slice of a position
    fn take_partial(&mut self, symbol: &str, level: TpLevel) -> Option<PositionEvent> {
        let idx = self.state.positions.iter().position(|p| p.symbol == symbol)?;
        let now = Utc::now();

        let (event, entry, price) = {
            let pos = &mut self.state.positions[idx];
            let (price, status, notes) = match level {
                TpLevel::Tp1 => (pos.tp1, LedgerStatus::Tp1Hit, "TP1 Hit"),
                TpLevel::Tp2 => (pos.tp2, LedgerStatus::Tp2Hit, "TP2 Hit"),
                TpLevel::Tp3 => return None,
            };

            let exited = match level {
                TpLevel::Tp1 => pos.initial_size * self.config.tp1_exit_fraction,
                _ => (pos.initial_size * self.config.tp2_exit_fraction).min(pos.size),
            };
            pos.size -= exited;
            match level {
                TpLevel::Tp1 => {
                    pos.tp1_hit = true;
                    pos.stop_loss = pos.entry_price;
                }
                _ => pos.tp2_hit = true,
            }
            pos.notes = notes.to_string();

            let realized_pnl = (price - pos.entry_price) * exited;
            let event = PositionEvent::PartialExit {
                symbol: symbol.to_string(),
                level,
                price,
                exited,
                remaining: pos.size,
                realized_pnl,
            };
            let entry = LedgerEntry::from_position(pos, pos.size, realized_pnl, status, now);
            (event, entry, price)
        };

        let realized_pnl = event.realized_pnl();
        self.state.capital += realized_pnl;
        self.persist();
        self.record(entry);

        self.notifier.notify(Notification::TakeProfit {
            symbol: symbol.to_string(),
            level,
            price,
        });

        tracing::info!(
            symbol,
            %level,
            %price,
            pnl = %realized_pnl,
            capital = %self.state.capital,
            "Take profit hit"
        );
        if level == TpLevel::Tp1 {
            tracing::info!(symbol, "Stop moved to breakeven");
        }
        telemetry::increment(CounterMetric::PartialExits);
        self.publish_gauges();
        Some(event)
    }

    /// Close a position fully at `price`
    ///
    /// Realized P&L is `(price - entry) * size` unless `realized_pnl_override`
    /// is given. Capital changes exactly once, by the realized amount.
    pub fn close(
        &mut self,
        symbol: &str,
        price: Decimal,
        reason: ExitReason,
        realized_pnl_override: Option<Decimal>,
    ) -> Option<PositionEvent> {
        let idx = self.state.positions.iter().position(|p| p.symbol == symbol)?;
        let mut position = self.state.positions.remove(idx);
        let now = Utc::now();

        let exited = position.size;
        let realized_pnl =
            realized_pnl_override.unwrap_or_else(|| (price - position.entry_price) * exited);
        self.state.capital += realized_pnl;
        position.size = Decimal::ZERO;
        position.notes = reason.to_string();
        self.persist();

        let status = match &reason {
            ExitReason::StopLoss => LedgerStatus::StopLoss,
            ExitReason::FullTakeProfit => LedgerStatus::Tp3FullExit,
            ExitReason::Other(label) => LedgerStatus::Closed(label.clone()),
        };
        self.record(LedgerEntry::from_position(
            &position,
            exited,
            realized_pnl,
            status,
            now,
        ));

        let notification = match &reason {
            ExitReason::StopLoss => Notification::StopLoss {
                symbol: symbol.to_string(),
                price,
            },
            ExitReason::FullTakeProfit => Notification::TakeProfit {
                symbol: symbol.to_string(),
                level: TpLevel::Tp3,
                price,
            },
            ExitReason::Other(label) => Notification::Closed {
                symbol: symbol.to_string(),
                reason: label.clone(),
                price,
                realized_pnl,
            },
        };
        self.notifier.notify(notification);

        tracing::info!(
            symbol,
            %reason,
            %price,
            size = %exited,
            pnl = %realized_pnl,
            capital = %self.state.capital,
            "Closed position"
        );
        telemetry::increment(match reason {
            ExitReason::StopLoss => CounterMetric::StopLosses,
            ExitReason::FullTakeProfit => CounterMetric::FullTakeProfits,
            ExitReason::Other(_) => CounterMetric::OtherCloses,
        });
        self.publish_gauges();

        Some(PositionEvent::Closed {
            symbol: symbol.to_string(),
            reason,
            price,
            exited,
            realized_pnl,
        })
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            tracing::error!(error = %e, "Failed to save portfolio state, memory is ahead of disk");
        }
    }

    fn record(&self, entry: LedgerEntry) {
        if let Err(e) = self.ledger.record(&entry) {
            tracing::error!(error = %e, symbol = %entry.symbol, status = %entry.status, "Failed to write ledger entry");
        }
    }

    fn publish_gauges(&self) {
        telemetry::set_gauge(
            GaugeMetric::Capital,
            self.state.capital.to_f64().unwrap_or_default(),
        );
        telemetry::set_gauge(GaugeMetric::OpenPositions, self.state.open_count() as f64);
    }
}
