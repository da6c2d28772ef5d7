//! Shared storage substrate for docstore.
//!
//! Provides an ordered byte key/value [`Storage`] abstraction with an in-memory
//! backend, plus the lexicographic key encodings used to lay higher-level
//! structures (hashes, sorted sets) out over a single ordered keyspace.

pub mod bytes;
pub mod serde;
pub mod storage;

pub use bytes::BytesRange;
pub use storage::config::StorageConfig;
pub use storage::{
    Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead, StorageResult,
};
