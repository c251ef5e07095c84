use std::sync::Arc;

use candlescan::{
    config::AppConfig,
    inference::gemini::GeminiClient,
    logger::init_tracing,
    market::binance::BinanceClient,
    metrics::counters::Counters,
    notify::telegram::TelegramNotifier,
    scan::engine::{EngineConfig, ScanEngine, ScanHandle},
    settings::{Settings, SettingsStore, json_store::JsonSettingsStore},
};

/// Log view transitions so a headless run is observable; a real
/// presentation layer would subscribe the same way.
fn start_view_observer(handle: &ScanHandle) {
    let mut rx = handle.subscribe();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();

            if let Some(error) = &view.error {
                tracing::warn!(symbol = %view.symbol, error = %error, "view error");
            } else if let Some(analysis) = &view.last_analysis {
                tracing::debug!(
                    symbol = %view.symbol,
                    price = view.price,
                    signal = %analysis.signal,
                    confidence = analysis.confidence,
                    next_scan = %view.next_scan,
                    "view updated"
                );
            }
        }
    });
}

async fn load_settings(store: &JsonSettingsStore) -> anyhow::Result<Settings> {
    match store.load().await? {
        Some(settings) => Ok(settings),
        None => {
            let defaults = Settings::default();
            store.save(&defaults).await?;
            tracing::info!("no persisted settings found; defaults written");
            Ok(defaults)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("starting candlescan...");

    let cfg = AppConfig::from_env();

    if cfg.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; analyses will fail until it is provided");
    }

    let settings_store = Arc::new(JsonSettingsStore::new(cfg.settings_path.clone()));
    let settings = load_settings(&settings_store).await?;

    let market = Arc::new(BinanceClient::new(
        cfg.binance_endpoint.clone(),
        cfg.candle_limit,
    )?);
    let analyzer = Arc::new(GeminiClient::new(
        cfg.gemini_endpoint.clone(),
        cfg.gemini_api_key.clone(),
        cfg.gemini_models.clone(),
    )?);
    let notifier = Arc::new(TelegramNotifier::new(cfg.telegram_endpoint.clone())?);

    let (engine, handle) = ScanEngine::new(
        EngineConfig::from_app(&cfg),
        settings,
        market,
        analyzer,
        notifier,
        settings_store,
        Counters::default(),
    );

    start_view_observer(&handle);
    tokio::spawn(engine.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Dropping the handle lets the engine loop wind down.
    drop(handle);

    Ok(())
}
