use serde::{Deserialize, Serialize};

use crate::inference::types::AnalysisResult;
use crate::market::types::Candle;
use crate::scan::signal_log::SignalLogEntry;

/// The externally observable state of the scanner.
///
/// Everything a presentation layer needs; it carries no decision logic
/// and is republished wholesale after each unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    /// The symbol the user is currently looking at.
    pub symbol: String,
    pub price: f64,
    pub change_24h_pct: f64,
    /// OHLCV candles for `symbol`, most-recent last.
    pub candles: Vec<Candle>,
    pub last_analysis: Option<AnalysisResult>,

    /// True while an inference call for the foreground symbol runs.
    pub analyzing: bool,
    /// True only until the first candles arrive; symbol switches keep
    /// the previous chart on screen instead of blanking it.
    pub loading: bool,
    /// Foreground-symbol error, if any. Background failures never land
    /// here.
    pub error: Option<String>,
    /// Informational outcome of user-driven actions (notifier test).
    pub notice: Option<String>,

    /// Countdown to the next candle boundary, rendered `MM:SS`.
    pub next_scan: String,
    /// Recent qualifying signals across the whole watchlist.
    pub recent_signals: Vec<SignalLogEntry>,
}

impl MarketView {
    pub fn initial(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            change_24h_pct: 0.0,
            candles: Vec::new(),
            last_analysis: None,
            analyzing: false,
            loading: true,
            error: None,
            notice: None,
            next_scan: "--:--".to_string(),
            recent_signals: Vec::new(),
        }
    }
}
