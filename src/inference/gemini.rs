//! Gemini inference client.
//!
//! Rate-limit handling lives entirely in here: each model variant is
//! retried with a growing backoff, then the next variant is tried. The
//! scan engine never inspects these internals, only the final result.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::inference::Analyzer;
use crate::inference::errors::InferenceError;
use crate::inference::types::AnalysisResult;
use crate::market::types::Candle;

/// How many of the most recent candles are included in the prompt.
const PROMPT_CANDLES: usize = 60;

/// Rate-limit retries per model variant before falling back to the next.
const RETRIES_PER_MODEL: u32 = 2;

pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    models: Vec<String>,
    /// Backoff grows as `backoff_unit * attempt`; zero in tests.
    backoff_unit: Duration,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        models: Vec<String>,
    ) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            models,
            backoff_unit: Duration::from_secs(6),
        })
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        prompt: &str,
    ) -> Result<String, InferenceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            // Quota errors also show up as 403/400 with a
            // RESOURCE_EXHAUSTED status string in the body.
            if status == StatusCode::TOO_MANY_REQUESTS || detail.contains("RESOURCE_EXHAUSTED") {
                return Err(InferenceError::RateLimited {
                    model: model.to_string(),
                });
            }
            return Err(InferenceError::Api {
                status: status.as_u16(),
                detail: truncate(&detail, 300),
            });
        }

        let decoded: GenerateResponse = resp.json().await?;

        decoded
            .candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait::async_trait]
impl Analyzer for GeminiClient {
    #[instrument(skip(self, candles), fields(symbol = %symbol))]
    async fn analyze(
        &self,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<AnalysisResult, InferenceError> {
        let api_key = self.api_key.as_deref().ok_or(InferenceError::MissingApiKey)?;

        let prompt = build_prompt(symbol, candles);
        let mut last_rate_limited = String::new();

        for model in &self.models {
            let mut attempt = 0u32;
            loop {
                match self.generate(model, api_key, &prompt).await {
                    Ok(text) => {
                        debug!(model = %model, "inference succeeded");
                        return parse_analysis(&text);
                    }
                    Err(e) if e.is_rate_limit() && attempt < RETRIES_PER_MODEL => {
                        attempt += 1;
                        let wait = self.backoff_unit * attempt;
                        warn!(
                            model = %model,
                            attempt,
                            wait_ms = wait.as_millis() as u64,
                            "rate limited; backing off"
                        );
                        sleep(wait).await;
                    }
                    Err(e) if e.is_rate_limit() => {
                        // This variant is saturated; fall back to the next.
                        warn!(model = %model, "model exhausted; trying next variant");
                        last_rate_limited = model.clone();
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Err(InferenceError::Exhausted(format!(
            "every model variant rate-limited, last: {last_rate_limited}"
        )))
    }
}

#[derive(Serialize)]
struct PromptCandle {
    t: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

fn build_prompt(symbol: &str, candles: &[Candle]) -> String {
    let start = candles.len().saturating_sub(PROMPT_CANDLES);
    let rows: Vec<PromptCandle> = candles[start..]
        .iter()
        .map(|c| PromptCandle {
            t: chrono::DateTime::from_timestamp_millis(c.open_time)
                .map(|dt| dt.format("%H:%M").to_string())
                .unwrap_or_default(),
            o: c.open,
            h: c.high,
            l: c.low,
            c: c.close,
            v: c.volume.round(),
        })
        .collect();

    let series = serde_json::to_string(&rows).unwrap_or_default();

    format!(
        "You are an expert short-term scalping analyst working on the 5-minute timeframe.\n\
         Analyze {symbol}/USDT using the most recent {} candles: {series}\n\
         \n\
         STRATEGY:\n\
         - Focus on price action, RSI and support/resistance zones.\n\
         - Target trades held for roughly 15-45 minutes.\n\
         - Only report high confidence when several indicators align.\n\
         \n\
         Respond with JSON only:\n\
         1. signal: BUY, SELL or NEUTRAL.\n\
         2. confidence: percentage.\n\
         3. reasoning: three short technical observations.\n\
         4. keyLevels: {{ support, resistance }}.\n\
         5. tradePlan: {{ entry, stopLoss, takeProfit }}.\n\
         6. indicators: {{ rsi, trend: \"Up/Down/Sideways\" }}.",
        rows.len(),
    )
}

fn response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "signal": { "type": "STRING" },
            "confidence": { "type": "NUMBER" },
            "reasoning": { "type": "ARRAY", "items": { "type": "STRING" } },
            "keyLevels": {
                "type": "OBJECT",
                "properties": {
                    "support": { "type": "NUMBER" },
                    "resistance": { "type": "NUMBER" }
                },
                "required": ["support", "resistance"]
            },
            "tradePlan": {
                "type": "OBJECT",
                "properties": {
                    "entry": { "type": "NUMBER" },
                    "stopLoss": { "type": "NUMBER" },
                    "takeProfit": { "type": "NUMBER" }
                }
            },
            "indicators": {
                "type": "OBJECT",
                "properties": {
                    "rsi": { "type": "NUMBER" },
                    "trend": { "type": "STRING" }
                },
                "required": ["rsi", "trend"]
            }
        },
        "required": ["signal", "confidence", "reasoning", "keyLevels", "indicators"]
    })
}

/// Parse the model's JSON payload, tolerating markdown code fences some
/// model versions wrap around structured output.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, InferenceError> {
    let clean = text.replace("```json", "").replace("```", "");
    serde_json::from_str(clean.trim()).map_err(|e| InferenceError::Malformed(e.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
