pub mod json_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::notify::NotifyConfig;
use crate::scan::types::DEFAULT_WATCHLIST;

/// User settings persisted across restarts.
///
/// Loaded once at startup; saved on every mutation. The engine never
/// reads the store again after boot, so stale on-disk content only
/// matters for the next process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub watchlist: Vec<String>,
    pub interval_min: u32,
    pub notify: NotifyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            interval_min: 15,
            notify: NotifyConfig::default(),
        }
    }
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` when no settings were ever saved.
    async fn load(&self) -> anyhow::Result<Option<Settings>>;

    async fn save(&self, settings: &Settings) -> anyhow::Result<()>;
}
