use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::settings::{Settings, SettingsStore};

/// Settings persisted as a pretty-printed JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> anyhow::Result<Option<Settings>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read settings {}", self.path.display()));
            }
        };

        let settings = serde_json::from_str(&raw)
            .with_context(|| format!("parse settings {}", self.path.display()))?;

        Ok(Some(settings))
    }

    async fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(settings).context("serialize settings")?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create settings dir {}", parent.display()))?;
        }

        tokio::fs::write(&self.path, raw)
            .await
            .with_context(|| format!("write settings {}", self.path.display()))?;

        Ok(())
    }
}
