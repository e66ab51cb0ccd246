//! Error types for the ledger subsystem.

use thiserror::Error;

/// Errors surfaced by [`crate::DocumentStore`] adapters and the
/// [`crate::LedgerService`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Underlying I/O failed (file-backed adapter).
    #[error("store I/O error: {message}")]
    Io {
        /// Readable description.
        message: String,
    },

    /// A record failed to encode or decode.
    #[error("store codec error for key {key}: {message}")]
    Codec {
        /// Key of the offending record.
        key: String,
        /// Readable description.
        message: String,
    },
}

impl StoreError {
    /// Wrap an I/O error.
    pub fn io(err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }

    /// Wrap a codec error for a key.
    pub fn codec(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        StoreError::Codec {
            key: key.into(),
            message: err.to_string(),
        }
    }
}
