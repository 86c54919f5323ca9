//! Notification module
//!
//! Fire-and-forget delivery of human-readable trade events. Delivery
//! failures are logged by the implementation and never reach the caller.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::NotifierConfig;
use crate::ledger::format_fixed;
use crate::portfolio::{Position, TpLevel};

/// Events worth telling a human about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// New position opened
    Entry(Position),
    /// Take-profit level reached
    TakeProfit {
        symbol: String,
        level: TpLevel,
        price: Decimal,
    },
    /// Position stopped out
    StopLoss { symbol: String, price: Decimal },
    /// Position closed for any other reason
    Closed {
        symbol: String,
        reason: String,
        price: Decimal,
        realized_pnl: Decimal,
    },
}

impl Notification {
    /// Markdown message text
    pub fn render(&self) -> String {
        match self {
            Notification::Entry(p) => format!(
                "🚀 **ENTRY TRIGGERED**\n\
                 Symbol: `{}`\n\
                 Executing at: `{}`\n\
                 Size: `{}`\n\
                 Stop Loss: `{}`\n\
                 TP1: `{}` | TP2: `{}` | TP3: `{}`",
                p.symbol,
                p.entry_price,
                format_fixed(p.size, 4),
                format_fixed(p.stop_loss, 4),
                format_fixed(p.tp1, 4),
                format_fixed(p.tp2, 4),
                format_fixed(p.tp3, 4)
            ),
            Notification::TakeProfit {
                symbol,
                level,
                price,
            } => format!(
                "💰 **TAKE PROFIT {} HIT**\nSymbol: `{}`\nPrice: `{}`",
                level.number(),
                symbol,
                price
            ),
            Notification::StopLoss { symbol, price } => {
                format!("🛑 **STOP LOSS HIT**\nSymbol: `{}`\nPrice: `{}`", symbol, price)
            }
            Notification::Closed {
                symbol,
                reason,
                price,
                realized_pnl,
            } => format!(
                "📕 **POSITION CLOSED**\nSymbol: `{}`\nReason: {}\nPrice: `{}`\nP/L: `{}`",
                symbol,
                reason,
                price,
                format_fixed(*realized_pnl, 2)
            ),
        }
    }
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Queue a notification; never blocks on delivery and never fails
    fn notify(&self, notification: Notification);

    /// Deliver whatever is still queued, then stop accepting notifications
    async fn shutdown(&self) {}
}

/// Logs notifications instead of sending them
#[derive(Default)]
pub struct LogNotifier {
    warned: AtomicBool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!("Telegram credentials not set, notifications are logged only");
        }
        tracing::info!(message = %notification.render(), "Notification");
    }
}

/// Build the notifier the configuration allows
///
/// Must be called from within a tokio runtime when credentials are present.
pub fn from_config(config: &NotifierConfig) -> Arc<dyn Notifier> {
    match config.credentials() {
        Some((token, chat_id)) => Arc::new(TelegramNotifier::spawn(config, token, chat_id)),
        None => Arc::new(LogNotifier::new()),
    }
}
