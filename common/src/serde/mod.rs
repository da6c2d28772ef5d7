//! Key encodings that preserve lexicographic ordering.

pub mod key_prefix;
pub mod sortable;
pub mod terminated_bytes;

/// Error raised when a stored key or value cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializeError {
    pub message: String,
}

impl std::error::Error for DeserializeError {}

impl std::fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
