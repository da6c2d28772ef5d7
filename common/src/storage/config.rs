//! Storage backend configuration.

use serde::{Deserialize, Serialize};

/// Selects the backend behind [`Storage`](super::Storage).
///
/// ```toml
/// [storage]
/// type = "InMemory"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Process-local ordered map. Contents are lost when the storage is dropped.
    #[default]
    InMemory,
}
