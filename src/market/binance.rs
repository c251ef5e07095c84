//! Binance spot REST client.
//!
//! Symbols are base-asset tickers (BTC, ETH, ...); the quote currency is
//! fixed and appended here, never stored in the watchlist.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::market::MarketData;
use crate::market::errors::MarketError;
use crate::market::types::{Candle, Ticker};

/// Quote currency every watched symbol trades against.
pub const QUOTE_ASSET: &str = "USDT";

#[derive(Clone)]
pub struct BinanceClient {
    http: Client,
    base_url: String,
    limit: u32,
}

impl BinanceClient {
    pub fn new(base_url: String, limit: u32) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url,
            limit,
        })
    }

    fn pair(symbol: &str) -> String {
        format!("{symbol}{QUOTE_ASSET}")
    }
}

#[async_trait]
impl MarketData for BinanceClient {
    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, MarketError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            Self::pair(symbol),
            interval,
            self.limit
        );

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let rows: Vec<Vec<Value>> = resp.json().await?;

        let candles = parse_kline_rows(&rows)?;

        debug!(count = candles.len(), "klines fetched");

        Ok(candles)
    }

    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketError> {
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}",
            self.base_url,
            Self::pair(symbol)
        );

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let dto: Ticker24h = resp.json().await?;

        Ok(Ticker {
            last_price: parse_decimal(&dto.last_price, "lastPrice")?,
            change_24h_pct: parse_decimal(&dto.price_change_percent, "priceChangePercent")?,
        })
    }
}

/// 24h ticker payload; numeric fields arrive as strings.
#[derive(Debug, Deserialize)]
struct Ticker24h {
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "priceChangePercent")]
    price_change_percent: String,
}

fn parse_decimal(raw: &str, field: &'static str) -> Result<f64, MarketError> {
    raw.parse::<f64>().map_err(|_| MarketError::Malformed(field))
}

/// Decode kline rows.
///
/// Each row is a positional array: open time, then OHLCV as decimal
/// strings (remaining positions are ignored).
pub fn parse_kline_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, MarketError> {
    rows.iter().map(|row| parse_kline_row(row)).collect()
}

fn parse_kline_row(row: &[Value]) -> Result<Candle, MarketError> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or(MarketError::Malformed("kline open time"))?;

    let decimal = |idx: usize, field: &'static str| -> Result<f64, MarketError> {
        row.get(idx)
            .and_then(Value::as_str)
            .ok_or(MarketError::Malformed(field))
            .and_then(|s| parse_decimal(s, field))
    };

    Ok(Candle {
        open_time,
        open: decimal(1, "kline open")?,
        high: decimal(2, "kline high")?,
        low: decimal(3, "kline low")?,
        close: decimal(4, "kline close")?,
        volume: decimal(5, "kline volume")?,
    })
}
