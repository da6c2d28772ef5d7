//! Error types for document store operations.

use common::StorageError;
use common::serde::DeserializeError;

/// Error type for document store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Storage-related errors from the underlying store.
    Storage(String),

    /// Encoding or decoding errors, including malformed numeric fields.
    Encoding(String),

    /// Invalid input or parameter errors.
    InvalidInput(String),

    /// A store round trip did not complete before its deadline.
    Timeout(String),

    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<DeserializeError> for Error {
    fn from(err: DeserializeError) -> Self {
        Error::Encoding(err.message)
    }
}

/// Result type alias for document store operations.
pub type Result<T> = std::result::Result<T, Error>;
