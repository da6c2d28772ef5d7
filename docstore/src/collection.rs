//! Entity-level operations over one collection.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{Document, FieldReader, NumericPolicy};
use crate::config::OperationOptions;
use crate::error::{Error, Result};
use crate::index::SecondaryIndex;
use crate::keys::Namespace;
use crate::store::{Deadline, RecordStore};

/// A named set of documents of type `D`.
///
/// Each document is stored as a hash at `<namespace>.<id>`. When `D` declares
/// an [`INDEX_NAME`](Document::INDEX_NAME), inserts also add an entry to the
/// collection's secondary index so documents can be found by that attribute.
///
/// Every operation computes one [`Deadline`] from the collection's timeout (or
/// the per-call override) and passes it to each store call it makes.
///
/// # Consistency
///
/// An insert is two independent store writes: the record, then the index
/// entry. If the second write fails the record stays in place and is only
/// reachable by primary key. Concurrent inserts of the same id are
/// last-writer-wins.
pub struct Collection<D: Document> {
    store: Arc<dyn RecordStore>,
    namespace: Namespace,
    index: Option<SecondaryIndex>,
    op_timeout: Duration,
    numeric_policy: NumericPolicy,
    _document: PhantomData<fn() -> D>,
}

impl<D: Document> Collection<D> {
    pub fn new(
        store: Arc<dyn RecordStore>,
        namespace: Namespace,
        op_timeout: Duration,
        numeric_policy: NumericPolicy,
    ) -> Self {
        let index = D::INDEX_NAME.map(|name| SecondaryIndex::new(namespace.index_key(name)));
        Self {
            store,
            namespace,
            index,
            op_timeout,
            numeric_policy,
            _document: PhantomData,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn index(&self) -> Option<&SecondaryIndex> {
        self.index.as_ref()
    }

    fn deadline(&self, options: OperationOptions) -> Deadline {
        Deadline::after(options.timeout.unwrap_or(self.op_timeout))
    }

    /// Replaces the stored record with the present fields of `document`, then
    /// indexes its indexed attribute.
    ///
    /// Fields of an earlier version that `document` leaves absent are removed.
    pub async fn insert(&self, document: &D) -> Result<()> {
        self.insert_with_options(document, OperationOptions::default())
            .await
    }

    pub async fn insert_with_options(&self, document: &D, options: OperationOptions) -> Result<()> {
        let id = document.id();
        if id.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cannot insert into {} without a primary id",
                self.namespace
            )));
        }
        let deadline = self.deadline(options);
        let key = self.namespace.record_key(id);

        self.store
            .hash_replace(&key, &document.encode(), deadline)
            .await?;

        if let (Some(index), Some(value)) = (&self.index, document.indexed_value()) {
            index
                .add_entry(self.store.as_ref(), value, id, deadline)
                .await?;
        }
        tracing::debug!(key = %key, "inserted document");
        Ok(())
    }

    /// Loads the document stored under `id`, or `None` if there is none.
    pub async fn find_by_primary_key(&self, id: &str) -> Result<Option<D>> {
        self.find_by_primary_key_with_options(id, OperationOptions::default())
            .await
    }

    pub async fn find_by_primary_key_with_options(
        &self,
        id: &str,
        options: OperationOptions,
    ) -> Result<Option<D>> {
        self.load(id, self.deadline(options)).await
    }

    async fn load(&self, id: &str, deadline: Deadline) -> Result<Option<D>> {
        let key = self.namespace.record_key(id);
        let fields = self.store.hash_get_all(&key, deadline).await?;
        if fields.is_empty() {
            tracing::debug!(key = %key, "no document");
            return Ok(None);
        }
        D::decode(&FieldReader::new(&fields, self.numeric_policy)).map(Some)
    }

    /// Finds the document whose indexed attribute equals `value`.
    ///
    /// Index entries left behind after a document's attribute changed are
    /// skipped: a candidate only matches if its stored attribute still equals
    /// `value`. Returns `None` when no document matches.
    pub async fn find_by_secondary_attribute(&self, value: &str) -> Result<Option<D>> {
        self.find_by_secondary_attribute_with_options(value, OperationOptions::default())
            .await
    }

    pub async fn find_by_secondary_attribute_with_options(
        &self,
        value: &str,
        options: OperationOptions,
    ) -> Result<Option<D>> {
        let Some(index) = &self.index else {
            return Err(Error::InvalidInput(format!(
                "collection {} has no secondary index",
                self.namespace
            )));
        };
        let deadline = self.deadline(options);

        for id in index.candidates(self.store.as_ref(), value, deadline).await? {
            match self.load(&id, deadline).await? {
                Some(document) if document.indexed_value() == Some(value) => {
                    return Ok(Some(document));
                }
                _ => {
                    tracing::warn!(
                        index = index.key(),
                        value,
                        id = %id,
                        "skipping stale index entry"
                    );
                }
            }
        }
        Ok(None)
    }
}
