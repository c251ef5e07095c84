//! Per-symbol record of the last candle submitted for inference.

use std::collections::HashMap;

/// Answers "has this symbol's latest candle already been analyzed?".
///
/// Only inequality is checked, never ordering: a re-fetch of an older
/// candle (or a backward-moving clock) still reads as stale, which errs
/// on the side of re-analysis.
#[derive(Debug, Default)]
pub struct StalenessTracker {
    last_analyzed: HashMap<String, i64>,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no candle for `symbol` was analyzed yet, or when the
    /// recorded open-time differs from `candle_time`.
    pub fn is_stale(&self, symbol: &str, candle_time: i64) -> bool {
        self.last_analyzed
            .get(symbol)
            .is_none_or(|&recorded| recorded != candle_time)
    }

    /// Record that `symbol`'s candle at `candle_time` was analyzed.
    /// Idempotent.
    pub fn mark_analyzed(&mut self, symbol: &str, candle_time: i64) {
        self.last_analyzed.insert(symbol.to_string(), candle_time);
    }

    pub fn last_analyzed(&self, symbol: &str) -> Option<i64> {
        self.last_analyzed.get(symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbol_is_stale() {
        let tracker = StalenessTracker::new();
        assert!(tracker.is_stale("BTC", 1_000));
    }

    #[test]
    fn mark_analyzed_is_idempotent() {
        let mut tracker = StalenessTracker::new();
        tracker.mark_analyzed("BTC", 1_000);
        tracker.mark_analyzed("BTC", 1_000);
        assert!(!tracker.is_stale("BTC", 1_000));
    }

    #[test]
    fn any_different_candle_time_is_stale() {
        let mut tracker = StalenessTracker::new();
        tracker.mark_analyzed("BTC", 1_000);

        assert!(tracker.is_stale("BTC", 2_000));
        // a candle time moving *backwards* is still treated as stale
        assert!(tracker.is_stale("BTC", 500));
    }

    #[test]
    fn symbols_are_tracked_independently() {
        let mut tracker = StalenessTracker::new();
        tracker.mark_analyzed("BTC", 1_000);

        assert!(!tracker.is_stale("BTC", 1_000));
        assert!(tracker.is_stale("ETH", 1_000));
    }
}
