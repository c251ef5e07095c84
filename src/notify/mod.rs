pub mod message;
pub mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outbound notification settings, user-editable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub enabled: bool,
    /// Minimum signal confidence (percent) that may be notified on.
    pub min_confidence: f64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            enabled: false,
            min_confidence: 75.0,
        }
    }
}

impl NotifyConfig {
    pub fn has_credentials(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    /// Whether dispatching is both requested and possible.
    pub fn is_ready(&self) -> bool {
        self.enabled && self.has_credentials()
    }
}

/// Chat destination for one dispatch, captured from the config at
/// decision time so a concurrent settings change cannot tear it.
#[derive(Debug, Clone)]
pub struct NotifyTarget {
    pub bot_token: String,
    pub chat_id: String,
}

impl From<&NotifyConfig> for NotifyTarget {
    fn from(cfg: &NotifyConfig) -> Self {
        Self {
            bot_token: cfg.bot_token.clone(),
            chat_id: cfg.chat_id.clone(),
        }
    }
}

/// Fire-and-forget message sink. Failures are logged by the caller and
/// never retried; the next qualifying signal simply tries again.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target: &NotifyTarget, text: &str) -> anyhow::Result<()>;
}
