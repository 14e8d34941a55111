use thiserror::Error;

/// Failures surfaced by a [`crate::gateway::ChainGateway`].
///
/// Callers branch on retryability: `Unavailable` is safe to retry as-is,
/// `Rejected` means the request is invalid against current chain state and
/// must be re-derived, `Timeout` means the bounded wait elapsed without an
/// observation (the underlying transaction may still land).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain unavailable: {0}")]
    Unavailable(String),

    #[error("rejected by node: {0}")]
    Rejected(String),

    #[error("timed out waiting for the chain")]
    Timeout,
}

/// Failures surfaced by a [`crate::oracle::PriceOracle`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price feed unavailable: {0}")]
    Unavailable(String),

    #[error("malformed price from feed: {0}")]
    Malformed(String),
}

/// A fee quote fails as a whole; a partial cost estimate is never returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("fiat price unavailable: {0}")]
    PriceUnavailable(String),
}

impl From<PriceError> for QuoteError {
    fn from(err: PriceError) -> Self {
        QuoteError::PriceUnavailable(err.to_string())
    }
}
