use thiserror::Error;

/// Failure taxonomy for brokerage operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Network or rate-limit failure; safe to retry for idempotent reads.
    #[error("transient brokerage failure: {0}")]
    Transient(String),

    /// Requested market data does not exist (empty chain, no qualifying
    /// contract). Not retryable.
    #[error("resource not available: {0}")]
    NotAvailable(String),

    /// The brokerage refused the request.
    #[error("brokerage rejected request: {0}")]
    Rejected(String),

    /// A response could not be decoded into the expected shape.
    #[error("malformed brokerage response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BrokerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transient(error.to_string())
        }
    }
}
