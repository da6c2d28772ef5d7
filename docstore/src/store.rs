//! The hash and sorted-set operations collections are built on.
//!
//! [`RecordStore`] is the minimal operation set the document layer needs from a
//! key-value store. [`StorageRecordStore`] provides it on top of any ordered
//! [`Storage`] by laying hashes and sorted sets out as individual records (see
//! [`crate::serde`]).
//!
//! Every call carries a [`Deadline`]. A call whose deadline has already passed
//! fails without touching storage; one that is still running when the deadline
//! expires is abandoned with [`Error::Timeout`]. No call is retried.

use std::future::Future;
use std::ops::Bound::{Excluded, Included};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::storage::in_memory::InMemoryStorage;
use common::{BytesRange, Record, RecordOp, Storage};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::codec::FieldMap;
use crate::error::{Error, Result};
use crate::serde::{
    HASH_FIELD, SORTED_ENTRY, decode_hash_field_key, decode_score, decode_sorted_entry_key,
    encode_hash_field_key, encode_score, encode_sorted_entry_key, encode_sorted_score_key,
    structure_range,
};

/// Point in time after which a store call fails with [`Error::Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

/// Runs `fut` to completion unless `deadline` passes first.
pub(crate) async fn within<T>(
    deadline: Deadline,
    operation: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    if deadline.is_expired() {
        return Err(Error::Timeout(format!(
            "{} not started: deadline already passed",
            operation
        )));
    }
    tokio::time::timeout_at(deadline.instant(), fut)
        .await
        .map_err(|_| Error::Timeout(format!("{} exceeded its deadline", operation)))?
}

/// One end of a lexicographic member range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// Members equal to or beyond the value.
    Inclusive(String),
    /// Members strictly beyond the value.
    Exclusive(String),
    /// No limit on this side.
    Unbounded,
}

/// Minimal key-value store operations used by collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes the given fields of the hash at `key` in one atomic step.
    ///
    /// Listed fields are overwritten; fields not listed are left untouched.
    async fn hash_set(&self, key: &str, fields: &FieldMap, deadline: Deadline) -> Result<()>;

    /// Replaces the hash at `key` with exactly `fields` in one atomic step.
    ///
    /// Fields stored before and not listed are removed.
    async fn hash_replace(&self, key: &str, fields: &FieldMap, deadline: Deadline) -> Result<()>;

    /// Reads every field of the hash at `key`. Empty when the key is absent.
    async fn hash_get_all(&self, key: &str, deadline: Deadline) -> Result<FieldMap>;

    /// Adds `member` to the sorted set at `key`, or updates its score.
    ///
    /// Returns `true` when the member was not present before.
    async fn sorted_set_add(
        &self,
        key: &str,
        score: f64,
        member: &str,
        deadline: Deadline,
    ) -> Result<bool>;

    /// Returns members between `min` and `max` in lexicographic order.
    ///
    /// The members of the set are expected to share one score; ordering across
    /// different scores is not defined.
    async fn sorted_set_range_by_lex(
        &self,
        key: &str,
        min: LexBound,
        max: LexBound,
        limit: Option<usize>,
        deadline: Deadline,
    ) -> Result<Vec<String>>;

    /// Releases resources held by the store.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// [`RecordStore`] over an ordered [`Storage`].
pub struct StorageRecordStore {
    storage: Arc<dyn Storage>,
    // Serializes writes that read before they apply.
    writes: Mutex<()>,
}

impl StorageRecordStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            writes: Mutex::new(()),
        }
    }

    /// Creates a store with an in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStorage::new()))
    }

    async fn current_score(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let record = self
            .storage
            .get(encode_sorted_score_key(key, member))
            .await?;
        record.map(|r| decode_score(&r.value)).transpose()
    }

    /// Score shared by the members of the set, taken from its first entry.
    async fn leading_score(&self, key: &str) -> Result<Option<f64>> {
        let mut iter = self
            .storage
            .scan_iter(structure_range(SORTED_ENTRY, key))
            .await?;
        match iter.next().await? {
            Some(record) => Ok(Some(decode_sorted_entry_key(&record.key)?.0)),
            None => Ok(None),
        }
    }
}

/// One put per field of the hash at `key`. Hashes cannot be empty.
fn field_puts(operation: &str, key: &str, fields: &FieldMap) -> Result<Vec<RecordOp>> {
    if fields.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} on {} requires at least one field",
            operation, key
        )));
    }
    Ok(fields
        .iter()
        .map(|(field, value)| {
            RecordOp::Put(Record::new(
                encode_hash_field_key(key, field),
                Bytes::copy_from_slice(value.as_bytes()),
            ))
        })
        .collect())
}

/// Storage range of the entries scored `score` whose members lie in `min..max`.
fn lex_range(key: &str, score: f64, min: &LexBound, max: &LexBound) -> BytesRange {
    let same_score = BytesRange::prefix(encode_sorted_entry_key(key, score, ""));
    let start = match min {
        LexBound::Inclusive(m) => Included(encode_sorted_entry_key(key, score, m)),
        LexBound::Exclusive(m) => Excluded(encode_sorted_entry_key(key, score, m)),
        LexBound::Unbounded => same_score.start.clone(),
    };
    let end = match max {
        LexBound::Inclusive(m) => Included(encode_sorted_entry_key(key, score, m)),
        LexBound::Exclusive(m) => Excluded(encode_sorted_entry_key(key, score, m)),
        LexBound::Unbounded => same_score.end,
    };
    BytesRange::new(start, end)
}

#[async_trait]
impl RecordStore for StorageRecordStore {
    #[tracing::instrument(level = "trace", skip_all, fields(key = key))]
    async fn hash_set(&self, key: &str, fields: &FieldMap, deadline: Deadline) -> Result<()> {
        let ops = field_puts("hash_set", key, fields)?;
        within(deadline, "hash_set", async {
            let _guard = self.writes.lock().await;
            self.storage.apply(ops).await.map_err(Error::from)
        })
        .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(key = key))]
    async fn hash_replace(&self, key: &str, fields: &FieldMap, deadline: Deadline) -> Result<()> {
        let puts = field_puts("hash_replace", key, fields)?;
        within(deadline, "hash_replace", async {
            let _guard = self.writes.lock().await;
            let existing = self.storage.scan(structure_range(HASH_FIELD, key)).await?;
            let mut ops: Vec<RecordOp> = Vec::with_capacity(existing.len() + puts.len());
            ops.extend(existing.into_iter().map(|r| RecordOp::Delete(r.key)));
            ops.extend(puts);
            self.storage.apply(ops).await.map_err(Error::from)
        })
        .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(key = key))]
    async fn hash_get_all(&self, key: &str, deadline: Deadline) -> Result<FieldMap> {
        within(deadline, "hash_get_all", async {
            let records = self.storage.scan(structure_range(HASH_FIELD, key)).await?;
            let mut fields = FieldMap::new();
            for record in records {
                let field = decode_hash_field_key(&record.key)?;
                let value = String::from_utf8(record.value.to_vec()).map_err(|e| {
                    Error::Encoding(format!("value of field {} is not valid UTF-8: {}", field, e))
                })?;
                fields.insert(field, value);
            }
            Ok(fields)
        })
        .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(key = key))]
    async fn sorted_set_add(
        &self,
        key: &str,
        score: f64,
        member: &str,
        deadline: Deadline,
    ) -> Result<bool> {
        if score.is_nan() {
            return Err(Error::InvalidInput("sorted set score must not be NaN".to_string()));
        }
        within(deadline, "sorted_set_add", async {
            let _guard = self.writes.lock().await;
            let previous = self.current_score(key, member).await?;
            if previous == Some(score) {
                return Ok(false);
            }
            let mut ops: Vec<RecordOp> = Vec::with_capacity(3);
            if let Some(previous) = previous {
                ops.push(RecordOp::Delete(encode_sorted_entry_key(key, previous, member)));
            }
            ops.push(Record::empty(encode_sorted_entry_key(key, score, member)).into());
            ops.push(Record::new(encode_sorted_score_key(key, member), encode_score(score)).into());
            self.storage.apply(ops).await?;
            Ok(previous.is_none())
        })
        .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(key = key))]
    async fn sorted_set_range_by_lex(
        &self,
        key: &str,
        min: LexBound,
        max: LexBound,
        limit: Option<usize>,
        deadline: Deadline,
    ) -> Result<Vec<String>> {
        within(deadline, "sorted_set_range_by_lex", async {
            let Some(score) = self.leading_score(key).await? else {
                return Ok(Vec::new());
            };
            let limit = limit.unwrap_or(usize::MAX);
            let mut iter = self
                .storage
                .scan_iter(lex_range(key, score, &min, &max))
                .await?;
            let mut members = Vec::new();
            while members.len() < limit {
                let Some(record) = iter.next().await? else {
                    break;
                };
                members.push(decode_sorted_entry_key(&record.key)?.1);
            }
            Ok(members)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.storage.close().await.map_err(Error::from)
    }
}
