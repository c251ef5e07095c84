pub mod errors;
pub mod gemini;
pub mod types;

use async_trait::async_trait;

use crate::inference::errors::InferenceError;
use crate::inference::types::AnalysisResult;
use crate::market::types::Candle;

/// Trading-signal inference over a window of candles.
///
/// Implementations own their retry/fallback behavior; the engine only
/// sees eventual success or a descriptive error, and retries strictly
/// "next sweep".
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        candles: &[Candle],
    ) -> Result<AnalysisResult, InferenceError>;
}
