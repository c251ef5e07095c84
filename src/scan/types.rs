//! Watchlist and scan-engine command surface.

use crate::notify::NotifyConfig;

/// Symbol re-seeded whenever the watchlist would become empty.
pub const DEFAULT_SYMBOL: &str = "BTC";

/// Watchlist used when no persisted settings exist yet.
pub const DEFAULT_WATCHLIST: [&str; 6] = ["BTC", "ETH", "SOL", "NEAR", "BNB", "DOGE"];

/// Ordered set of unique, uppercase base-asset tickers.
///
/// Invariant: never empty. Removing the last entry re-seeds
/// [`DEFAULT_SYMBOL`] instead of leaving the scanner with nothing to do.
#[derive(Debug, Clone)]
pub struct Watchlist {
    symbols: Vec<String>,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

impl Watchlist {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self {
            symbols: Vec::new(),
        };
        for s in symbols {
            list.add(s.as_ref());
        }
        if list.symbols.is_empty() {
            list.symbols.push(DEFAULT_SYMBOL.to_string());
        }
        list
    }

    /// Append a symbol; returns false when it was already present (or
    /// normalizes to nothing).
    pub fn add(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() || self.symbols.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    /// Remove a symbol; returns false when it was not present. Removing
    /// the last entry re-seeds the default symbol.
    pub fn remove(&mut self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let before = self.symbols.len();
        self.symbols.retain(|s| s != &symbol);
        let removed = self.symbols.len() < before;

        if self.symbols.is_empty() {
            self.symbols.push(DEFAULT_SYMBOL.to_string());
        }

        removed
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// First entry; the non-empty invariant makes this total.
    pub fn first(&self) -> &str {
        &self.symbols[0]
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        // the invariant makes this constant, kept for completeness
        self.symbols.is_empty()
    }
}

/// Commands accepted by the scan engine.
#[derive(Debug, Clone)]
pub enum ScanCommand {
    /// Show a watchlist symbol and force a fresh fetch+analysis.
    SetSymbol(String),
    /// Add to the watchlist and make it the foreground symbol.
    AddSymbol(String),
    /// Drop from the watchlist; reassigns foreground when needed.
    RemoveSymbol(String),
    /// Change the scan cadence (minutes, one of 1/5/15/30/60).
    SetIntervalMin(u32),
    /// Replace notification settings.
    SetNotifyConfig(NotifyConfig),
    /// Force fetch+analysis of the current foreground symbol.
    AnalyzeNow,
    /// Send a connectivity-test message through the notifier.
    TestNotifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_dedups() {
        let mut list = Watchlist::new(["btc", " eth ", "BTC"]);
        assert_eq!(list.symbols(), &["BTC", "ETH"]);

        assert!(!list.add("eth"));
        assert!(list.add("sol"));
        assert_eq!(list.symbols(), &["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn empty_input_seeds_the_default() {
        let list = Watchlist::new(Vec::<String>::new());
        assert_eq!(list.symbols(), &[DEFAULT_SYMBOL]);
    }

    #[test]
    fn removing_the_last_symbol_reseeds() {
        let mut list = Watchlist::new(["ETH"]);

        assert!(list.remove("ETH"));

        assert_eq!(list.len(), 1);
        assert_eq!(list.first(), DEFAULT_SYMBOL);
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut list = Watchlist::new(["BTC", "ETH", "SOL"]);

        assert!(list.remove("eth"));
        assert!(!list.remove("ETH"));

        assert_eq!(list.symbols(), &["BTC", "SOL"]);
    }
}
