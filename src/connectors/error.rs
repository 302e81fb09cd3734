// src/connectors/error.rs
use thiserror::Error;

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Failures on the brokerage boundary. The monitoring loop decides which of
/// these are fatal and which are skippable; none carry that policy themselves.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("broker api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed broker response: {0}")]
    Parse(String),
}
