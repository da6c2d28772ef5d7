use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{RecordOp, Storage};
use crate::{BytesRange, Record, StorageError, StorageIterator, StorageRead, StorageResult};

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// Keys are kept in byte order, so range scans behave like those of an
/// ordered on-disk store. All data is lost when the last handle is dropped.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data.get(&key).map(|value| Record::new(key, value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        let records: Vec<Record> = data
            .range((range.start_bound().cloned(), range.end_bound().cloned()))
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect();

        Ok(Box::new(InMemoryIterator {
            records: records.into_iter(),
        }))
    }
}

struct InMemoryIterator {
    records: std::vec::IntoIter<Record>,
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    /// Applies the whole batch under a single write lock acquisition.
    #[tracing::instrument(level = "trace", skip_all, fields(ops = ops.len()))]
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    async fn flush(&self) -> StorageResult<()> {
        // No-op for in-memory storage - all writes are immediately visible
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    Once(StorageError),
    Persistent(StorageError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Returns the error stored in `slot`, clearing it first if it is a one-shot.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures and latency on demand.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared). The delay
/// is applied before every read and write and is driven by tokio's timer, so
/// tests running with a paused clock stay deterministic.
///
/// Gated behind the `test-utils` feature.
///
/// ```ignore
/// let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
/// storage.fail_apply_once(StorageError::Storage("disk full".into()));
/// storage.set_delay(Duration::from_secs(30));
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_apply: FailSlot,
    fail_read: FailSlot,
    delay: arc_swap::ArcSwap<Option<std::time::Duration>>,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage with no failures or delay configured.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_apply: arc_swap::ArcSwap::from_pointee(None),
            fail_read: arc_swap::ArcSwap::from_pointee(None),
            delay: arc_swap::ArcSwap::from_pointee(None),
        })
    }

    /// Makes `apply` return the given error on the next call only.
    pub fn fail_apply_once(&self, err: StorageError) {
        self.fail_apply.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `get` and `scan_iter` return the given error on every subsequent call.
    pub fn fail_read(&self, err: StorageError) {
        self.fail_read
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Delays every subsequent call by `delay` before it reaches the inner storage.
    pub fn set_delay(&self, delay: std::time::Duration) {
        self.delay.store(Arc::new(Some(delay)));
    }

    async fn wait(&self) {
        let delay = **self.delay.load();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        self.wait().await;
        check_failure(&self.fail_read)?;
        self.inner.get(key).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        self.wait().await;
        check_failure(&self.fail_read)?;
        self.inner.scan_iter(range).await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        self.wait().await;
        check_failure(&self.fail_apply)?;
        self.inner.apply(ops).await
    }

    async fn flush(&self) -> StorageResult<()> {
        self.inner.flush().await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(key: &'static str, value: &'static str) -> RecordOp {
        Record::new(Bytes::from(key), Bytes::from(value)).into()
    }

    #[tokio::test]
    async fn should_return_none_when_key_not_found() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.get(Bytes::from("missing_key")).await.unwrap();

        // then
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        storage.apply(vec![put("key", "old")]).await.unwrap();

        // when
        storage.apply(vec![put("key", "new")]).await.unwrap();

        // then
        let record = storage.get(Bytes::from("key")).await.unwrap().unwrap();
        assert_eq!(record.value, Bytes::from("new"));
    }

    #[tokio::test]
    async fn should_apply_puts_and_deletes_in_order() {
        // given
        let storage = InMemoryStorage::new();
        storage.apply(vec![put("a", "1"), put("b", "2")]).await.unwrap();

        // when
        storage
            .apply(vec![RecordOp::Delete(Bytes::from("a")), put("c", "3")])
            .await
            .unwrap();

        // then
        let records = storage.scan(BytesRange::unbounded()).await.unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.key.clone()).collect();
        assert_eq!(keys, vec![Bytes::from("b"), Bytes::from("c")]);
    }

    #[tokio::test]
    async fn should_scan_records_with_prefix_in_key_order() {
        // given
        let storage = InMemoryStorage::new();
        storage
            .apply(vec![
                put("users.b", "2"),
                put("tokens.a", "x"),
                put("users.a", "1"),
                put("usersx", "y"),
            ])
            .await
            .unwrap();

        // when
        let records = storage
            .scan(BytesRange::prefix(Bytes::from("users.")))
            .await
            .unwrap();

        // then
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, Bytes::from("users.a"));
        assert_eq!(records[1].key, Bytes::from("users.b"));
    }

    #[tokio::test]
    async fn should_iterate_lazily_over_snapshot_of_range() {
        // given
        let storage = InMemoryStorage::new();
        storage.apply(vec![put("a", "1")]).await.unwrap();
        let mut iter = storage.scan_iter(BytesRange::unbounded()).await.unwrap();

        // when
        storage.apply(vec![put("b", "2")]).await.unwrap();

        // then
        assert_eq!(iter.next().await.unwrap().unwrap().key, Bytes::from("a"));
        assert!(iter.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_return_empty_vec_when_scanning_empty_storage() {
        let storage = InMemoryStorage::new();

        let records = storage.scan(BytesRange::unbounded()).await.unwrap();

        assert!(records.is_empty());
    }
}
