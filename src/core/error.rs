use thiserror::Error;

/// Failures surfaced by the quote provider and the quote client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("Invalid currency pair: {0}")]
    InvalidSymbol(String),

    /// No connectivity, DNS failure, timeout or a body that could not be read.
    #[error("Request error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    /// The provider answered with an explicit `Error Message`.
    #[error("{0}")]
    Upstream(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),
}
