use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Exchange configuration
    // =========================
    /// Base URL of the exchange REST API.
    pub binance_endpoint: String,

    /// Candle interval label requested from the exchange (e.g. "5m").
    ///
    /// The scan cadence is a separate, coarser setting: scans fire on
    /// candle-close boundaries of the user-selected scan interval, while
    /// the analysis itself always runs over fine-grained candles.
    pub candle_interval: String,

    /// Number of candles fetched per request.
    pub candle_limit: u32,

    // =========================
    // Inference configuration
    // =========================
    /// Base URL of the generative-AI API.
    pub gemini_endpoint: String,

    /// API key; absence is surfaced as a configuration error at analysis
    /// time rather than at startup, since the key may be provided later.
    pub gemini_api_key: Option<String>,

    /// Model variants in preference order.
    ///
    /// The first entry is the primary model; the rest are fallbacks tried
    /// in order when a model keeps answering with rate-limit errors.
    pub gemini_models: Vec<String>,

    // =========================
    // Notifier configuration
    // =========================
    /// Base URL of the Telegram Bot API.
    pub telegram_endpoint: String,

    // =========================
    // Scan engine configuration
    // =========================
    /// Cadence of the driving timer.
    pub tick_period_ms: u64,

    /// How close to a candle boundary (ms) a tick must land to start a
    /// sweep. Ticks fire once per second, so anything >= one tick period
    /// guarantees the boundary is not missed.
    pub boundary_epsilon_ms: i64,

    /// Guard window (ms) after a user-driven symbol switch during which
    /// background sweeps are skipped or aborted.
    pub guard_window_ms: i64,

    /// Fixed delay between watchlist symbols within one sweep.
    ///
    /// This serializes third-party calls on purpose: both the exchange
    /// and the inference API rate-limit aggressively.
    pub symbol_delay_ms: u64,

    // =========================
    // Persistence
    // =========================
    /// Path of the persisted user-settings file.
    pub settings_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        let gemini_models = std::env::var("GEMINI_MODELS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| {
                vec![
                    "gemini-3-flash-preview".to_string(),
                    "gemini-2.5-flash".to_string(),
                ]
            });

        Self {
            binance_endpoint: std::env::var("BINANCE_HTTP_ENDPOINT")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            candle_interval: "5m".to_string(),
            candle_limit: 300,

            gemini_endpoint: std::env::var("GEMINI_HTTP_ENDPOINT")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_api_key,
            gemini_models,

            telegram_endpoint: std::env::var("TELEGRAM_HTTP_ENDPOINT")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),

            tick_period_ms: 1_000,
            boundary_epsilon_ms: 2_000,
            guard_window_ms: 5_000,
            symbol_delay_ms: 2_000,

            settings_path: std::env::var("CANDLESCAN_SETTINGS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("candlescan_settings.json")),
        }
    }
}
