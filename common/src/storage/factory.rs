//! Creates storage instances from configuration.

use std::sync::Arc;

use super::config::StorageConfig;
use super::in_memory::InMemoryStorage;
use super::{Storage, StorageResult};

/// Creates a storage instance based on the provided configuration.
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config {
        StorageConfig::InMemory => {
            tracing::debug!("creating in-memory storage");
            Ok(Arc::new(InMemoryStorage::new()))
        }
    }
}
