//! Error types for bundle loading and encoding.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or encoding a bundle.
#[derive(Error, Debug)]
pub enum Error {
    /// The document could not be encoded or decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A bundle or relocation file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Canonical JSON only admits integers.
    #[error("Value at '{path}' is not representable in canonical JSON: {value}")]
    NonCanonicalNumber {
        /// JSON pointer to the offending value.
        path: String,
        /// The rejected number as written.
        value: String,
    },
}

impl Error {
    /// Create an I/O error for a file path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a non-canonical number error.
    #[must_use]
    pub fn non_canonical_number(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NonCanonicalNumber {
            path: path.into(),
            value: value.into(),
        }
    }
}
