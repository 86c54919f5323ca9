//! Market data module
//!
//! Ticker, candle and live price retrieval from the exchange, plus
//! selection of the tradable pair universe.

mod bybit;
mod types;
mod universe;

pub use bybit::BybitClient;
pub use types::{Candle, Ticker};
pub use universe::{select_pairs, PairsFile, UniverseChange};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::portfolio::PriceSample;

/// Market data retrieval errors
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("exchange returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("exchange error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Source of market data
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 24h summaries for every listed symbol
    async fn tickers(&self) -> Result<Vec<Ticker>, MarketDataError>;

    /// Most recent `limit` candles, oldest first
    async fn candles(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, MarketDataError>;

    /// Live prices for the given symbols; unknown symbols are omitted
    async fn price_samples(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceSample>, MarketDataError>;
}
