//! Error taxonomy for the rate engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The currency code is not present in the registry. Raised before any
    /// I/O is attempted.
    #[error("unknown currency '{code}'")]
    CurrencyNotFound { code: String },

    /// A single provider request failed. Carries the underlying reason
    /// (timeout, connection, HTTP status, parse error) as text.
    #[error("external API request failed: {reason}")]
    ApiRequest { reason: String },

    /// The resolver exhausted every lookup tier for this pair.
    #[error("no rate available for pair '{pair}'")]
    RateUnavailable { pair: String },

    /// A snapshot or ledger write could not complete. The previous on-disk
    /// state is preserved.
    #[error("failed to persist '{path}': {reason}")]
    Persistence { path: String, reason: String },
}

impl CoreError {
    pub fn api_request(reason: impl Into<String>) -> Self {
        CoreError::ApiRequest {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
