//! Outbound-notification deduplication.

use std::collections::HashMap;

use crate::inference::types::Signal;

/// Suppresses repeat notifications of the same directional signal within
/// one time bucket (bucket width = the scan interval).
///
/// Deliberately coarser than staleness tracking: a symbol is analyzed
/// far more often than it is notified on.
#[derive(Debug, Default)]
pub struct NotificationDeduper {
    last_key: HashMap<String, String>,
}

fn bucket_key(symbol: &str, signal: Signal, now_ms: i64, bucket_ms: i64) -> String {
    format!("{symbol}:{signal}:{}", now_ms.div_euclid(bucket_ms))
}

impl NotificationDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a notification for this signal should go out now.
    ///
    /// Neutral signals and signals below `min_confidence` never notify;
    /// otherwise at most one notification per (symbol, signal, bucket).
    pub fn should_notify(
        &self,
        symbol: &str,
        signal: Signal,
        confidence: f64,
        now_ms: i64,
        bucket_ms: i64,
        min_confidence: f64,
    ) -> bool {
        if signal == Signal::Neutral || confidence < min_confidence {
            return false;
        }
        let key = bucket_key(symbol, signal, now_ms, bucket_ms);
        self.last_key.get(symbol) != Some(&key)
    }

    /// Record that a dispatch was attempted for this signal/bucket.
    ///
    /// Called after the notifier call, success or not: the contract is
    /// "no duplicate attempts within a bucket", not exactly-once.
    pub fn record_notified(&mut self, symbol: &str, signal: Signal, now_ms: i64, bucket_ms: i64) {
        let key = bucket_key(symbol, signal, now_ms, bucket_ms);
        self.last_key.insert(symbol.to_string(), key);
    }
}
