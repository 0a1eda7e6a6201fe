//! Error types for manifest conversion.

use thiserror::Error;

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building manifests.
#[derive(Error, Debug)]
pub enum Error {
    /// A document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A digest string is malformed.
    #[error("Invalid digest '{0}'")]
    InvalidDigest(String),

    /// A digest uses an algorithm this crate does not compute.
    #[error("Unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),
}

impl Error {
    /// Create an invalid digest error.
    #[must_use]
    pub fn invalid_digest(digest: impl Into<String>) -> Self {
        Self::InvalidDigest(digest.into())
    }
}
