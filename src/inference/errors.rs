use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference api key is not configured")]
    MissingApiKey,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model {model} rate-limited the request")]
    RateLimited { model: String },

    #[error("model api error (status {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("model returned empty content")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    Malformed(String),

    #[error("all model variants exhausted: {0}")]
    Exhausted(String),
}

impl InferenceError {
    /// Whether this failure is worth a backoff-and-retry (vs. failing the
    /// sweep slot immediately).
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, InferenceError::RateLimited { .. })
    }
}
