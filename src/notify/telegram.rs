use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use crate::notify::{Notifier, NotifyTarget};

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build telegram http client")?;

        Ok(Self { http, base_url })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, target, text), level = "debug")]
    async fn send(&self, target: &NotifyTarget, text: &str) -> anyhow::Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, target.bot_token);

        let body = json!({
            "chat_id": target.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        self.http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("telegram request failed")?
            .error_for_status()
            .context("telegram rejected the message")?;

        debug!("telegram message delivered");

        Ok(())
    }
}
