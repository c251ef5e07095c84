use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed exchange response: {0}")]
    Malformed(&'static str),

    #[error("exchange returned no candles")]
    Empty,
}
