//! Bounded ring of recent qualifying signals.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::inference::types::Signal;

/// Display-only record of one produced signal. Appended independently of
/// whether a notification actually went out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLogEntry {
    pub ts_ms: i64,
    pub symbol: String,
    pub signal: Signal,
    pub price: f64,
    pub confidence: f64,
}

/// Keeps the most recent `capacity` entries, oldest dropped first.
#[derive(Debug)]
pub struct SignalLog {
    entries: VecDeque<SignalLogEntry>,
    capacity: usize,
}

/// Confidence floor for the log: a notch below the notify threshold so
/// the log is a superset of what is notified.
pub fn log_floor(min_confidence: f64) -> f64 {
    (min_confidence - 15.0).max(50.0)
}

impl SignalLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, entry: SignalLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries in chronological order, oldest first.
    pub fn snapshot(&self) -> Vec<SignalLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
