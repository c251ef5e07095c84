//! Outbound message formatting.

use chrono::DateTime;

use crate::inference::types::{AnalysisResult, Signal};

/// Render a qualifying signal as a Telegram Markdown message.
///
/// `candle_time_ms` is the open time of the candle the analysis ran on.
pub fn signal_message(
    symbol: &str,
    price: f64,
    analysis: &AnalysisResult,
    interval_min: u32,
    candle_time_ms: i64,
) -> String {
    let direction = match analysis.signal {
        Signal::Buy => "🟢 BUY",
        Signal::Sell => "🔴 SELL",
        Signal::Neutral => "NEUTRAL",
    };

    let reasoning = analysis
        .reasoning
        .iter()
        .map(|r| format!("• {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    let candle_close = DateTime::from_timestamp_millis(candle_time_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "🚀 *{interval_min}m Signal Alert*\n\
         \n\
         Pair: *{symbol}/USDT*\n\
         Signal: *{direction}*\n\
         Entry price: *${price}*\n\
         Confidence: *{confidence}%*\n\
         Trend: *{trend}*\n\
         \n\
         💡 *Analysis:*\n{reasoning}\n\
         \n\
         📉 Support: ${support}\n\
         📈 Resistance: ${resistance}\n\
         _Candle: {candle_close}_\n\
         \n\
         ⚠️ _Always honor your stop-loss and position sizing._",
        confidence = analysis.confidence,
        trend = analysis.indicators.trend,
        support = analysis.key_levels.support,
        resistance = analysis.key_levels.resistance,
    )
}

/// Connectivity-check message sent from the settings flow.
pub fn test_message() -> String {
    "🔔 *Connection test*\n\nThe scanner can reach this chat. Automatic signal alerts will be \
     delivered here."
        .to_string()
}
