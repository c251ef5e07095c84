//! Scripted collaborators for engine tests.
//!
//! Every mock records the calls it receives; a few can be told to fail
//! or to block until the test releases them, which is how the tests
//! interleave user commands with an in-flight sweep deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use candlescan::inference::Analyzer;
use candlescan::inference::errors::InferenceError;
use candlescan::inference::types::{AnalysisResult, Indicators, KeyLevels, Signal};
use candlescan::market::MarketData;
use candlescan::market::errors::MarketError;
use candlescan::market::types::{Candle, Ticker};
use candlescan::metrics::counters::Counters;
use candlescan::notify::{Notifier, NotifyTarget};
use candlescan::scan::engine::{EngineConfig, ScanEngine, ScanHandle};
use candlescan::settings::{Settings, SettingsStore};
use candlescan::time::Clock;

/// Settable wall clock, frozen unless the test moves it.
#[derive(Clone, Default)]
pub struct MockClock(Arc<AtomicI64>);

impl MockClock {
    pub fn set(&self, t_ms: i64) {
        self.0.store(t_ms, Ordering::SeqCst);
    }

    pub fn as_clock(&self) -> Clock {
        let inner = Arc::clone(&self.0);
        Arc::new(move || inner.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct MockMarket {
    /// Open time of the newest candle served for every symbol.
    pub candle_time: AtomicI64,
    fail: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockMarket {
    pub fn new(candle_time: i64) -> Arc<Self> {
        let market = Self::default();
        market.candle_time.store(candle_time, Ordering::SeqCst);
        Arc::new(market)
    }

    pub fn set_fail(&self, symbol: &str, fail: bool) {
        let mut guard = self.fail.lock().unwrap();
        if fail {
            guard.insert(symbol.to_string());
        } else {
            guard.remove(symbol);
        }
    }

    pub fn fetches(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == symbol)
            .count()
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _interval: &str,
    ) -> Result<Vec<Candle>, MarketError> {
        self.calls.lock().unwrap().push(symbol.to_string());

        if self.fail.lock().unwrap().contains(symbol) {
            return Err(MarketError::Empty);
        }

        let latest = self.candle_time.load(Ordering::SeqCst);
        Ok((0..3)
            .rev()
            .map(|i| Candle {
                open_time: latest - i * 300_000,
                open: 100.0,
                high: 110.0,
                low: 95.0,
                close: 105.0,
                volume: 1_000.0,
            })
            .collect())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, MarketError> {
        if self.fail.lock().unwrap().contains(symbol) {
            return Err(MarketError::Empty);
        }
        Ok(Ticker {
            last_price: 105.0,
            change_24h_pct: 1.5,
        })
    }
}

#[derive(Default)]
pub struct MockAnalyzer {
    results: Mutex<HashMap<String, AnalysisResult>>,
    fail: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MockAnalyzer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_result(&self, symbol: &str, result: AnalysisResult) {
        self.results
            .lock()
            .unwrap()
            .insert(symbol.to_string(), result);
    }

    pub fn set_fail(&self, symbol: &str, fail: bool) {
        let mut guard = self.fail.lock().unwrap();
        if fail {
            guard.insert(symbol.to_string());
        } else {
            guard.remove(symbol);
        }
    }

    /// The next `analyze` call for `symbol` parks until the returned
    /// gate is notified. One-shot.
    pub fn block_next(&self, symbol: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn analyses(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == symbol)
            .count()
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(
        &self,
        symbol: &str,
        _candles: &[Candle],
    ) -> Result<AnalysisResult, InferenceError> {
        self.calls.lock().unwrap().push(symbol.to_string());

        let gate = self.gates.lock().unwrap().remove(symbol);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail.lock().unwrap().contains(symbol) {
            return Err(InferenceError::EmptyResponse);
        }

        Ok(self
            .results
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| analysis(Signal::Neutral, 10.0)))
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub fail: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl MockNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, _target: &NotifyTarget, text: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("scripted notifier failure");
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettings {
    saved: Mutex<Option<Settings>>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saved(&self) -> Option<Settings> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load(&self) -> anyhow::Result<Option<Settings>> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        *self.saved.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

pub fn analysis(signal: Signal, confidence: f64) -> AnalysisResult {
    AnalysisResult {
        signal,
        confidence,
        reasoning: vec!["scripted".to_string()],
        key_levels: KeyLevels {
            support: 95.0,
            resistance: 110.0,
        },
        trade_plan: None,
        indicators: Indicators {
            rsi: 55.0,
            trend: "Up".to_string(),
        },
    }
}

pub struct Harness {
    pub clock: MockClock,
    pub market: Arc<MockMarket>,
    pub analyzer: Arc<MockAnalyzer>,
    pub notifier: Arc<MockNotifier>,
    pub store: Arc<MemorySettings>,
    pub counters: Counters,
    pub handle: ScanHandle,
}

/// Boot an engine with fast ticks, zero inter-symbol delay and a pinned
/// clock, then spawn its run loop.
pub fn spawn_engine(settings: Settings, clock_start_ms: i64, candle_time_ms: i64) -> Harness {
    let clock = MockClock::default();
    clock.set(clock_start_ms);

    let market = MockMarket::new(candle_time_ms);
    let analyzer = MockAnalyzer::new();
    let notifier = MockNotifier::new();
    let store = MemorySettings::new();
    let counters = Counters::default();

    let cfg = EngineConfig {
        tick_period: Duration::from_millis(10),
        symbol_delay: Duration::ZERO,
        clock: clock.as_clock(),
        ..EngineConfig::default()
    };

    let (engine, handle) = ScanEngine::new(
        cfg,
        settings,
        Arc::clone(&market) as Arc<dyn MarketData>,
        Arc::clone(&analyzer) as Arc<dyn Analyzer>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        counters.clone(),
    );

    tokio::spawn(engine.run());

    Harness {
        clock,
        market,
        analyzer,
        notifier,
        store,
        counters,
        handle,
    }
}

/// Poll `cond` until it holds or a generous timeout elapses.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}
