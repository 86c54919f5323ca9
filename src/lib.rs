//! trend-agent: long-only trend-following agent for crypto spot pairs
//!
//! This library provides the core components for:
//! - Market data and pair universe discovery from Bybit
//! - EMA/MACD/ATR features and the trend entry signal
//! - Volatility-based risk sizing and take-profit levels
//! - Virtual position lifecycle with staged exits
//! - Snapshot persistence and CSV trade ledger
//! - Telegram notifications
//! - Structured logging and Prometheus metrics

pub mod agent;
pub mod cli;
pub mod config;
pub mod indicators;
pub mod ledger;
pub mod market;
pub mod notify;
pub mod portfolio;
pub mod risk;
pub mod signal;
pub mod telemetry;
