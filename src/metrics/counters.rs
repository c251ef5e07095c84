use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub sweeps_started: Arc<AtomicU64>,
    pub sweeps_aborted: Arc<AtomicU64>,
    pub symbols_scanned: Arc<AtomicU64>,

    pub analyses_ok: Arc<AtomicU64>,
    pub analyses_failed: Arc<AtomicU64>,
    pub fetch_failures: Arc<AtomicU64>,
    pub stale_skips: Arc<AtomicU64>,

    pub notifications_sent: Arc<AtomicU64>,
    pub notify_failures: Arc<AtomicU64>,
}
