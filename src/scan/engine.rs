//! Scan engine: polling and analysis orchestration.
//!
//! Responsibilities:
//! - Drive the 1s timer and decide when a candle boundary is due.
//! - Sweep the watchlist sequentially, one symbol slot at a time.
//! - Keep the user-visible view consistent: only the foreground symbol
//!   publishes data or errors, and only while it is still foreground.
//! - Gate outbound notifications through threshold + dedup checks.
//!
//! Non-responsibilities:
//! - Fetching candles, running inference, delivering messages (trait
//!   collaborators do this; their failures fail one sweep slot only).
//! - Rendering (subscribers consume `MarketView` snapshots).
//!
//! Safety/liveness properties:
//! - At most one sweep is in flight; one boundary starts at most one
//!   sweep.
//! - A user symbol switch bumps the fetch generation and arms a guard
//!   window; the running sweep aborts at its next symbol slot and stale
//!   results are discarded instead of published.
//! - Every failure path returns the engine to idle; retry is strictly
//!   "next boundary".

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::future::try_join;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::inference::Analyzer;
use crate::inference::types::Signal;
use crate::logger::warn_if_slow;
use crate::market::MarketData;
use crate::market::types::{Candle, Ticker};
use crate::metrics::counters::Counters;
use crate::notify::message::{signal_message, test_message};
use crate::notify::{Notifier, NotifyConfig, NotifyTarget};
use crate::scan::signal_log::{SignalLog, SignalLogEntry, log_floor};
use crate::scan::types::{ScanCommand, Watchlist, normalize_symbol};
use crate::schedule::boundary;
use crate::schedule::dedup::NotificationDeduper;
use crate::schedule::staleness::StalenessTracker;
use crate::settings::{Settings, SettingsStore};
use crate::time::{Clock, system_clock};
use crate::view::ViewPublisher;
use crate::view::types::MarketView;

/// Engine knobs, split out of [`AppConfig`] so tests can shrink timings
/// and pin the clock.
#[derive(Clone)]
pub struct EngineConfig {
    pub tick_period: Duration,
    pub boundary_epsilon_ms: i64,
    pub guard_window_ms: i64,
    pub symbol_delay: Duration,
    pub candle_interval: String,
    pub signal_log_capacity: usize,
    pub command_buffer: usize,
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            boundary_epsilon_ms: 2_000,
            guard_window_ms: 5_000,
            symbol_delay: Duration::from_secs(2),
            candle_interval: "5m".to_string(),
            signal_log_capacity: 16,
            command_buffer: 32,
            clock: system_clock(),
        }
    }
}

impl EngineConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            tick_period: Duration::from_millis(cfg.tick_period_ms),
            boundary_epsilon_ms: cfg.boundary_epsilon_ms,
            guard_window_ms: cfg.guard_window_ms,
            symbol_delay: Duration::from_millis(cfg.symbol_delay_ms),
            candle_interval: cfg.candle_interval.clone(),
            ..Self::default()
        }
    }
}

/// Cloneable handle to a running engine: commands in, view snapshots out.
#[derive(Clone)]
pub struct ScanHandle {
    tx: mpsc::Sender<ScanCommand>,
    view_rx: watch::Receiver<MarketView>,
}

impl ScanHandle {
    pub async fn set_symbol(&self, symbol: impl Into<String>) -> anyhow::Result<()> {
        self.send(ScanCommand::SetSymbol(symbol.into())).await
    }

    pub async fn add_symbol(&self, symbol: impl Into<String>) -> anyhow::Result<()> {
        self.send(ScanCommand::AddSymbol(symbol.into())).await
    }

    pub async fn remove_symbol(&self, symbol: impl Into<String>) -> anyhow::Result<()> {
        self.send(ScanCommand::RemoveSymbol(symbol.into())).await
    }

    pub async fn set_interval_min(&self, minutes: u32) -> anyhow::Result<()> {
        self.send(ScanCommand::SetIntervalMin(minutes)).await
    }

    pub async fn set_notify_config(&self, cfg: NotifyConfig) -> anyhow::Result<()> {
        self.send(ScanCommand::SetNotifyConfig(cfg)).await
    }

    pub async fn analyze_now(&self) -> anyhow::Result<()> {
        self.send(ScanCommand::AnalyzeNow).await
    }

    pub async fn test_notifier(&self) -> anyhow::Result<()> {
        self.send(ScanCommand::TestNotifier).await
    }

    pub fn subscribe(&self) -> watch::Receiver<MarketView> {
        self.view_rx.clone()
    }

    /// The latest published snapshot.
    pub fn view(&self) -> MarketView {
        self.view_rx.borrow().clone()
    }

    async fn send(&self, cmd: ScanCommand) -> anyhow::Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("scan engine stopped"))
    }
}

/// Everything the engine mutates, behind one lock.
///
/// The lock is held only across synchronous sections, never across a
/// network await, so sweep slots and user commands interleave exactly at
/// the suspension points the design allows.
struct ScanCore {
    watchlist: Watchlist,
    foreground: String,
    interval_min: u32,
    notify: NotifyConfig,

    sweeping: bool,
    /// A switch arms this window; ticks inside it do not start sweeps.
    guard_until_ms: i64,
    /// Bumped on every user switch. Work captures the generation at
    /// fetch start and publishes only when it still matches.
    generation: u64,
    /// Boundary identity of the last sweep, so one boundary fires once.
    last_sweep_boundary_ms: i64,

    staleness: StalenessTracker,
    deduper: NotificationDeduper,
    signal_log: SignalLog,
}

impl ScanCore {
    fn guard_active(&self, now_ms: i64) -> bool {
        now_ms < self.guard_until_ms
    }

    fn is_foreground(&self, symbol: &str, generation: u64) -> bool {
        self.foreground == symbol && self.generation == generation
    }

    fn bucket_ms(&self) -> i64 {
        i64::from(self.interval_min) * 60_000
    }
}

struct Shared {
    cfg: EngineConfig,
    core: Mutex<ScanCore>,
    market: Arc<dyn MarketData>,
    analyzer: Arc<dyn Analyzer>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<dyn SettingsStore>,
    view: ViewPublisher,
    counters: Counters,
}

pub struct ScanEngine {
    shared: Arc<Shared>,
    rx: mpsc::Receiver<ScanCommand>,
}

impl ScanEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: EngineConfig,
        settings: Settings,
        market: Arc<dyn MarketData>,
        analyzer: Arc<dyn Analyzer>,
        notifier: Arc<dyn Notifier>,
        settings_store: Arc<dyn SettingsStore>,
        counters: Counters,
    ) -> (Self, ScanHandle) {
        let watchlist = Watchlist::new(&settings.watchlist);

        let interval_min = if boundary::is_supported(settings.interval_min) {
            settings.interval_min
        } else {
            warn!(
                error = %AppError::UnsupportedInterval(settings.interval_min),
                "falling back to a 15 minute scan interval"
            );
            15
        };

        let foreground = watchlist.first().to_string();
        let (view, view_rx) = ViewPublisher::new(MarketView::initial(&foreground));
        let (tx, rx) = mpsc::channel(cfg.command_buffer);

        let core = ScanCore {
            watchlist,
            foreground,
            interval_min,
            notify: settings.notify,
            sweeping: false,
            guard_until_ms: 0,
            generation: 0,
            last_sweep_boundary_ms: 0,
            staleness: StalenessTracker::new(),
            deduper: NotificationDeduper::new(),
            signal_log: SignalLog::new(cfg.signal_log_capacity),
        };

        let shared = Arc::new(Shared {
            cfg,
            core: Mutex::new(core),
            market,
            analyzer,
            notifier,
            settings: settings_store,
            view,
            counters,
        });

        (Self { shared, rx }, ScanHandle { tx, view_rx })
    }

    /// Drive the engine until every handle is dropped.
    pub async fn run(mut self) {
        let (symbol, generation) = {
            let core = self.shared.core.lock().await;
            (core.foreground.clone(), core.generation)
        };
        info!(symbol = %symbol, "scan engine started");

        // First paint: load the foreground symbol without waiting for a
        // candle boundary.
        tokio::spawn(Arc::clone(&self.shared).scan_symbol(symbol, generation, true));

        let mut ticker = interval(self.shared.cfg.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => Arc::clone(&self.shared).on_tick().await,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => Arc::clone(&self.shared).on_command(cmd).await,
                    None => {
                        info!("all scan handles dropped; engine stopping");
                        break;
                    }
                },
            }
        }
    }
}

impl Shared {
    /// One timer tick: refresh the countdown, start a sweep when due.
    async fn on_tick(self: Arc<Self>) {
        let now = (self.cfg.clock)();
        let start_sweep = {
            let mut core = self.core.lock().await;
            let remaining = boundary::time_until_boundary(now, core.interval_min);
            self.view
                .update(|v| v.next_scan = boundary::format_countdown(remaining));

            let boundary_ms = now + remaining;
            let due = remaining <= self.cfg.boundary_epsilon_ms
                && !core.sweeping
                && !core.guard_active(now)
                && boundary_ms != core.last_sweep_boundary_ms;

            if due {
                core.sweeping = true;
                core.last_sweep_boundary_ms = boundary_ms;
            }
            due
        };

        if start_sweep {
            tokio::spawn(Arc::clone(&self).run_sweep());
        }
    }

    /// One full pass over the watchlist, strictly in order.
    async fn run_sweep(self: Arc<Self>) {
        self.counters.sweeps_started.fetch_add(1, Ordering::Relaxed);

        let (symbols, sweep_generation) = {
            let core = self.core.lock().await;
            (core.watchlist.symbols().to_vec(), core.generation)
        };

        info!(symbols = symbols.len(), "watchlist sweep started");

        let mut aborted = false;
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.cfg.symbol_delay.is_zero() {
                // Deliberate serialization: collaborators rate-limit.
                sleep(self.cfg.symbol_delay).await;
            }

            // Cooperative abort, checked once per symbol slot. A user
            // switch bumps the generation; the remaining slots must not
            // run over the view the user just grabbed.
            {
                let core = self.core.lock().await;
                if core.generation != sweep_generation {
                    aborted = true;
                }
            }
            if aborted {
                self.counters.sweeps_aborted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    skipped = symbols.len() - i,
                    "sweep aborted by user switch"
                );
                break;
            }

            Arc::clone(&self)
                .scan_symbol(symbol.clone(), sweep_generation, false)
                .await;
            self.counters.symbols_scanned.fetch_add(1, Ordering::Relaxed);
        }

        self.core.lock().await.sweeping = false;
        info!(aborted, "watchlist sweep finished");
    }

    /// Fetch one symbol and analyze it when warranted.
    ///
    /// `generation` is the fetch-generation captured by the caller at
    /// start; all view publication re-checks it so results for a symbol
    /// the user has left are discarded, never shown.
    async fn scan_symbol(self: Arc<Self>, symbol: String, generation: u64, forced: bool) {
        {
            let core = self.core.lock().await;
            if core.is_foreground(&symbol, generation) {
                self.view.update(|v| {
                    v.symbol = symbol.clone();
                    v.loading = v.candles.is_empty();
                    v.error = None;
                });
            }
        }

        let fetched = try_join(
            self.market.fetch_candles(&symbol, &self.cfg.candle_interval),
            self.market.fetch_ticker(&symbol),
        )
        .await;

        let (candles, ticker) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!(symbol = %symbol, error = %e, "market fetch failed");
                self.fail_foreground(&symbol, generation, format!("exchange request failed: {e}"))
                    .await;
                return;
            }
        };

        let Some(latest) = candles.last().map(|c| c.open_time) else {
            self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
            warn!(symbol = %symbol, "exchange returned no candles");
            self.fail_foreground(&symbol, generation, "exchange returned no candles".to_string())
                .await;
            return;
        };

        let should_analyze = {
            let core = self.core.lock().await;
            let foreground = core.is_foreground(&symbol, generation);

            if foreground {
                // Fresh market data always reaches the view for the
                // symbol on screen, analyzed or not.
                self.view.update(|v| {
                    v.symbol = symbol.clone();
                    v.price = ticker.last_price;
                    v.change_24h_pct = ticker.change_24h_pct;
                    v.candles = candles.clone();
                    v.loading = false;
                    v.error = None;
                });
            }

            // The foreground symbol is re-analyzed even when not stale,
            // so a refresh always yields a current reading.
            let analyze = forced || foreground || core.staleness.is_stale(&symbol, latest);
            if !analyze {
                self.counters.stale_skips.fetch_add(1, Ordering::Relaxed);
            }
            analyze
        };

        if !should_analyze {
            debug!(symbol = %symbol, candle_time = latest, "candle already analyzed; skipping");
            return;
        }

        self.analyze_symbol(symbol, &candles, ticker, latest, generation)
            .await;
    }

    async fn analyze_symbol(
        &self,
        symbol: String,
        candles: &[Candle],
        ticker: Ticker,
        latest: i64,
        generation: u64,
    ) {
        {
            let core = self.core.lock().await;
            if core.is_foreground(&symbol, generation) {
                self.view.update(|v| v.analyzing = true);
            }
        }

        let outcome = warn_if_slow(
            "inference",
            Duration::from_secs(20),
            self.analyzer.analyze(&symbol, candles),
        )
        .await;

        let analysis = match outcome {
            Ok(a) => a,
            Err(e) => {
                // Staleness stays untouched: the next sweep retries.
                self.counters.analyses_failed.fetch_add(1, Ordering::Relaxed);
                warn!(symbol = %symbol, error = %e, "analysis failed");
                self.fail_foreground(&symbol, generation, format!("analysis failed: {e}"))
                    .await;
                return;
            }
        };

        self.counters.analyses_ok.fetch_add(1, Ordering::Relaxed);
        info!(
            symbol = %symbol,
            signal = %analysis.signal,
            confidence = analysis.confidence,
            "analysis complete"
        );

        let dispatch = {
            let mut core = self.core.lock().await;
            core.staleness.mark_analyzed(&symbol, latest);

            if core.is_foreground(&symbol, generation) {
                let published = analysis.clone();
                self.view.update(|v| {
                    v.analyzing = false;
                    v.last_analysis = Some(published);
                });
            }

            let now = (self.cfg.clock)();

            if analysis.signal != Signal::Neutral
                && analysis.confidence >= log_floor(core.notify.min_confidence)
            {
                core.signal_log.record(SignalLogEntry {
                    ts_ms: now,
                    symbol: symbol.clone(),
                    signal: analysis.signal,
                    price: ticker.last_price,
                    confidence: analysis.confidence,
                });
                let recent = core.signal_log.snapshot();
                self.view.update(|v| v.recent_signals = recent);
            }

            if core.notify.is_ready()
                && core.deduper.should_notify(
                    &symbol,
                    analysis.signal,
                    analysis.confidence,
                    now,
                    core.bucket_ms(),
                    core.notify.min_confidence,
                )
            {
                let text = signal_message(
                    &symbol,
                    ticker.last_price,
                    &analysis,
                    core.interval_min,
                    latest,
                );
                Some((NotifyTarget::from(&core.notify), text))
            } else {
                None
            }
        };

        if let Some((target, text)) = dispatch {
            // Dispatch outside the lock, then record the attempt win or
            // lose: the dedup contract is per-attempt, not per-delivery.
            match self.notifier.send(&target, &text).await {
                Ok(()) => {
                    self.counters
                        .notifications_sent
                        .fetch_add(1, Ordering::Relaxed);
                    info!(symbol = %symbol, signal = %analysis.signal, "notification dispatched");
                }
                Err(e) => {
                    self.counters.notify_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(symbol = %symbol, error = %e, "notification dispatch failed");
                }
            }

            let now = (self.cfg.clock)();
            let mut core = self.core.lock().await;
            let bucket_ms = core.bucket_ms();
            core.deduper
                .record_notified(&symbol, analysis.signal, now, bucket_ms);
        }
    }

    /// Surface a slot failure, but only onto the view it concerns.
    async fn fail_foreground(&self, symbol: &str, generation: u64, message: String) {
        let core = self.core.lock().await;
        if core.is_foreground(symbol, generation) {
            self.view.update(|v| {
                v.loading = false;
                v.analyzing = false;
                v.error = Some(message);
            });
        }
    }

    async fn on_command(self: Arc<Self>, cmd: ScanCommand) {
        match cmd {
            ScanCommand::SetSymbol(symbol) => {
                let symbol = normalize_symbol(&symbol);
                let known = { self.core.lock().await.watchlist.contains(&symbol) };
                if !known {
                    warn!(error = %AppError::UnknownSymbol(symbol), "ignoring symbol switch");
                    return;
                }
                self.switch_foreground(symbol).await;
            }

            ScanCommand::AddSymbol(symbol) => {
                let symbol = normalize_symbol(&symbol);
                if symbol.is_empty() {
                    return;
                }
                let added = { self.core.lock().await.watchlist.add(&symbol) };
                if added {
                    info!(symbol = %symbol, "symbol added to watchlist");
                    self.persist_settings().await;
                }
                // New or not, the requested symbol becomes the view.
                self.switch_foreground(symbol).await;
            }

            ScanCommand::RemoveSymbol(symbol) => {
                let symbol = normalize_symbol(&symbol);
                let (removed, was_foreground, next) = {
                    let mut core = self.core.lock().await;
                    let was_foreground = core.foreground == symbol;
                    let removed = core.watchlist.remove(&symbol);
                    (removed, was_foreground, core.watchlist.first().to_string())
                };
                if !removed {
                    warn!(error = %AppError::UnknownSymbol(symbol), "ignoring symbol removal");
                    return;
                }
                info!(symbol = %symbol, "symbol removed from watchlist");
                self.persist_settings().await;
                if was_foreground {
                    self.switch_foreground(next).await;
                }
            }

            ScanCommand::SetIntervalMin(minutes) => {
                if !boundary::is_supported(minutes) {
                    warn!(error = %AppError::UnsupportedInterval(minutes), "ignoring interval change");
                    return;
                }
                {
                    let mut core = self.core.lock().await;
                    core.interval_min = minutes;
                    // a new cadence means a new boundary identity
                    core.last_sweep_boundary_ms = 0;
                }
                info!(minutes, "scan interval changed");
                self.persist_settings().await;
            }

            ScanCommand::SetNotifyConfig(cfg) => {
                self.core.lock().await.notify = cfg;
                info!("notification settings updated");
                self.persist_settings().await;
            }

            ScanCommand::AnalyzeNow => {
                let (symbol, generation) = {
                    let core = self.core.lock().await;
                    (core.foreground.clone(), core.generation)
                };
                debug!(symbol = %symbol, "manual analysis requested");
                tokio::spawn(Arc::clone(&self).scan_symbol(symbol, generation, true));
            }

            ScanCommand::TestNotifier => self.test_notifier().await,
        }
    }

    /// Point the view at `symbol` and force a fresh load.
    ///
    /// Bumps the fetch generation (stale in-flight results get
    /// discarded) and arms the switch guard so the background sweep
    /// yields; the guard is released early once the forced load lands.
    async fn switch_foreground(self: Arc<Self>, symbol: String) {
        let generation = {
            let mut core = self.core.lock().await;
            core.foreground = symbol.clone();
            core.generation += 1;
            core.guard_until_ms = (self.cfg.clock)() + self.cfg.guard_window_ms;
            core.generation
        };

        info!(symbol = %symbol, "foreground symbol switched");
        self.view.update(|v| {
            v.symbol = symbol.clone();
            v.error = None;
            v.notice = None;
        });

        let shared = Arc::clone(&self);
        tokio::spawn(async move {
            Arc::clone(&shared)
                .scan_symbol(symbol, generation, true)
                .await;

            // Release the guard unless another switch re-armed it.
            let mut core = shared.core.lock().await;
            if core.generation == generation {
                core.guard_until_ms = 0;
            }
        });
    }

    async fn test_notifier(&self) {
        let target = {
            let core = self.core.lock().await;
            if !core.notify.has_credentials() {
                self.view.update(|v| {
                    v.notice = Some("notifier credentials are not configured".to_string());
                });
                return;
            }
            NotifyTarget::from(&core.notify)
        };

        match self.notifier.send(&target, &test_message()).await {
            Ok(()) => {
                info!("notifier test message delivered");
                self.view
                    .update(|v| v.notice = Some("test message delivered".to_string()));
            }
            Err(e) => {
                warn!(error = %e, "notifier test failed");
                self.view
                    .update(|v| v.notice = Some(format!("notifier test failed: {e}")));
            }
        }
    }

    /// Persist the user-mutable settings; failures are logged, never
    /// propagated into scan behavior.
    async fn persist_settings(&self) {
        let snapshot = {
            let core = self.core.lock().await;
            Settings {
                watchlist: core.watchlist.symbols().to_vec(),
                interval_min: core.interval_min,
                notify: core.notify.clone(),
            }
        };

        if let Err(e) = self.settings.save(&snapshot).await {
            warn!(error = %e, "failed to persist settings");
        }
    }
}
