//! Error types for chainvoice.
//!
//! One taxonomy shared by the verifier, the stores and the HTTP layer. The
//! HTTP layer maps each variant onto a status code in `api::mod`.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by chainvoice.
#[derive(Debug, Error)]
pub enum Error {
    /// A request field is missing, empty or unparseable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The login message does not carry a usable nonce line.
    #[error("malformed sign-in message: {0}")]
    MalformedMessage(String),

    /// The nonce embedded in the login message was already consumed.
    #[error("nonce already used")]
    ReplayDetected,

    /// The signature does not verify against the claimed address.
    #[error("invalid signature")]
    InvalidSignature,

    /// No invoice is stored under the given invoice number.
    #[error("invoice {0} not found")]
    NotFound(String),

    /// A storage backend failed to read or write.
    #[error("store error: {0}")]
    Store(String),

    /// The configuration is invalid or could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// An unexpected transport or library failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem or socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors callers caused (4xx territory), false for server faults.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MalformedMessage(_)
                | Self::ReplayDetected
                | Self::InvalidSignature
                | Self::NotFound(_)
        )
    }
}
