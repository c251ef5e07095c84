pub mod types;

use tokio::sync::watch;

use crate::view::types::MarketView;

/// Publishes immutable view snapshots to any number of subscribers.
///
/// Backed by a watch channel: subscribers always observe the latest
/// snapshot and can never block or slow the scan engine. Last write
/// wins; there is no history.
pub struct ViewPublisher {
    tx: watch::Sender<MarketView>,
}

impl ViewPublisher {
    pub fn new(initial: MarketView) -> (Self, watch::Receiver<MarketView>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    /// Mutate the current snapshot in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut MarketView)) {
        self.tx.send_modify(f);
    }

    /// A copy of the snapshot as subscribers currently see it.
    pub fn current(&self) -> MarketView {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MarketView> {
        self.tx.subscribe()
    }
}
