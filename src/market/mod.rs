pub mod binance;
pub mod errors;
pub mod types;

use async_trait::async_trait;

use crate::market::errors::MarketError;
use crate::market::types::{Candle, Ticker};

/// Market-data source consumed by the scan engine.
///
/// One sweep slot issues one candles fetch and one ticker fetch; any
/// failure fails that slot only and is retried on the next sweep.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Fetch OHLCV candles for `symbol`, most-recent last.
    async fn fetch_candles(&self, symbol: &str, interval: &str)
    -> Result<Vec<Candle>, MarketError>;

    /// Fetch the latest price and 24h change for `symbol`.
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketError>;
}
