use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("symbol {0} is not on the watchlist")]
    UnknownSymbol(String),

    #[error("unsupported scan interval: {0} minutes")]
    UnsupportedInterval(u32),
}
