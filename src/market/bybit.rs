//! Bybit v5 public REST client

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::{Candle, MarketData, MarketDataError, Ticker};
use crate::config::ExchangeConfig;
use crate::portfolio::PriceSample;

/// Bybit's maximum kline page size
const MAX_KLINE_LIMIT: usize = 1000;

/// Common response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    last_price: String,
    /// 24h turnover, i.e. volume in the quote asset
    #[serde(default)]
    turnover24h: String,
}

/// Client for Bybit's public market endpoints
pub struct BybitClient {
    base_url: String,
    category: String,
    interval: String,
    client: Client,
}

impl BybitClient {
    /// Create a client from exchange configuration
    pub fn new(config: &ExchangeConfig) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            category: config.category.clone(),
            interval: config.interval.clone(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, ?query, "Bybit request");

        let response = self.client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Status { status, body });
        }

        let envelope: Envelope<T> = response.json().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, MarketDataError> {
    if envelope.ret_code != 0 {
        return Err(MarketDataError::Api {
            code: envelope.ret_code,
            message: envelope.ret_msg,
        });
    }
    envelope
        .result
        .ok_or_else(|| MarketDataError::Decode("missing result".to_string()))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).ok()
}

fn parse_ticker(raw: &RawTicker) -> Option<Ticker> {
    Some(Ticker {
        symbol: raw.symbol.clone(),
        last_price: parse_decimal(&raw.last_price)?,
        quote_volume: parse_decimal(&raw.turnover24h).unwrap_or(Decimal::ZERO),
    })
}

/// `[start_ms, open, high, low, close, volume, turnover]`
fn parse_kline_row(row: &[String]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }
    let start_ms: i64 = row[0].parse().ok()?;
    Some(Candle {
        open_time: Utc.timestamp_millis_opt(start_ms).single()?,
        open: parse_decimal(&row[1])?,
        high: parse_decimal(&row[2])?,
        low: parse_decimal(&row[3])?,
        close: parse_decimal(&row[4])?,
        volume: parse_decimal(&row[5])?,
    })
}

/// Parse kline rows (newest first on the wire) into candles, oldest first
fn parse_klines(rows: &[Vec<String>]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = rows.iter().filter_map(|r| parse_kline_row(r)).collect();
    if candles.len() < rows.len() {
        tracing::warn!(
            dropped = rows.len() - candles.len(),
            "Dropped malformed kline rows"
        );
    }
    candles.sort_by_key(|c| c.open_time);
    candles
}

#[async_trait]
impl MarketData for BybitClient {
    async fn tickers(&self) -> Result<Vec<Ticker>, MarketDataError> {
        let result: ListResult<RawTicker> = self
            .get("/v5/market/tickers", &[("category", &self.category)])
            .await?;
        Ok(result.list.iter().filter_map(parse_ticker).collect())
    }

    async fn candles(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, MarketDataError> {
        let limit = limit.clamp(1, MAX_KLINE_LIMIT).to_string();
        let result: ListResult<Vec<String>> = self
            .get(
                "/v5/market/kline",
                &[
                    ("category", &self.category),
                    ("symbol", symbol),
                    ("interval", &self.interval),
                    ("limit", &limit),
                ],
            )
            .await?;
        Ok(parse_klines(&result.list))
    }

    /// Uses the last traded price only: the ticker's high/low cover 24h
    /// and would trigger exits on stale extremes
    async fn price_samples(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceSample>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let tickers = self.tickers().await?;
        Ok(tickers
            .into_iter()
            .filter(|t| symbols.contains(&t.symbol))
            .map(|t| (t.symbol, PriceSample::last(t.last_price)))
            .collect())
    }
}
