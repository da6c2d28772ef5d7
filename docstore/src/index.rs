//! Secondary index emulated with a zero-score sorted set.
//!
//! Each indexed record contributes one member `<value>:<id>` to the sorted set
//! at the index key. All members share score 0, so the set is ordered purely by
//! member bytes and a lexicographic range scan finds the members of a value.
//!
//! Lookups scan from `<value>:` inclusive to `<value>;` exclusive (`;` is the
//! byte after `:`). Only members whose value segment is exactly `<value>` fall
//! in that range, so `"ab"` never matches a member written for `"abc"`.

use crate::error::{Error, Result};
use crate::store::{Deadline, LexBound, RecordStore};

/// Separator between the indexed value and the primary id in a member.
pub const INDEX_SEPARATOR: char = ':';

/// Score shared by every index member.
pub const INDEX_SCORE: f64 = 0.0;

// First character ordered after INDEX_SEPARATOR.
const SEPARATOR_SUCCESSOR: char = ';';

/// Handle on the sorted set backing one secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    key: String,
}

impl SecondaryIndex {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Builds the member stored for `value` and `id`.
    pub fn member(value: &str, id: &str) -> Result<String> {
        check_value(value)?;
        Ok(format!("{}{}{}", value, INDEX_SEPARATOR, id))
    }

    /// Records that the entity `id` has `value`.
    ///
    /// Adding an existing member is a no-op. Entries for a previous value of the
    /// same id are not removed.
    pub async fn add_entry(
        &self,
        store: &dyn RecordStore,
        value: &str,
        id: &str,
        deadline: Deadline,
    ) -> Result<bool> {
        let member = Self::member(value, id)?;
        store
            .sorted_set_add(&self.key, INDEX_SCORE, &member, deadline)
            .await
    }

    /// Returns the id of the first entry indexed under exactly `value`.
    pub async fn find_by_prefix(
        &self,
        store: &dyn RecordStore,
        value: &str,
        deadline: Deadline,
    ) -> Result<Option<String>> {
        let ids = self.scan(store, value, Some(1), deadline).await?;
        Ok(ids.into_iter().next())
    }

    /// Returns the ids of every entry indexed under exactly `value`, in member order.
    pub async fn candidates(
        &self,
        store: &dyn RecordStore,
        value: &str,
        deadline: Deadline,
    ) -> Result<Vec<String>> {
        self.scan(store, value, None, deadline).await
    }

    async fn scan(
        &self,
        store: &dyn RecordStore,
        value: &str,
        limit: Option<usize>,
        deadline: Deadline,
    ) -> Result<Vec<String>> {
        check_value(value)?;
        let min = LexBound::Inclusive(format!("{}{}", value, INDEX_SEPARATOR));
        let max = LexBound::Exclusive(format!("{}{}", value, SEPARATOR_SUCCESSOR));
        let members = store
            .sorted_set_range_by_lex(&self.key, min, max, limit, deadline)
            .await?;
        members.iter().map(|m| primary_id(m)).collect()
    }
}

fn check_value(value: &str) -> Result<()> {
    if value.contains(INDEX_SEPARATOR) {
        return Err(Error::InvalidInput(format!(
            "indexed value {:?} contains the separator {:?}",
            value, INDEX_SEPARATOR
        )));
    }
    Ok(())
}

/// Extracts the id following the first separator of a member.
fn primary_id(member: &str) -> Result<String> {
    member
        .split_once(INDEX_SEPARATOR)
        .map(|(_, id)| id.to_string())
        .ok_or_else(|| Error::Encoding(format!("index member {:?} has no separator", member)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::StorageRecordStore;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10))
    }

    #[test]
    fn should_build_member_from_value_and_id() {
        assert_eq!(SecondaryIndex::member("G1", "U1").unwrap(), "G1:U1");
    }

    #[test]
    fn should_reject_value_containing_separator() {
        let result = SecondaryIndex::member("a:b", "U1");

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn should_keep_separators_inside_id() {
        assert_eq!(primary_id("G1:urn:user:7").unwrap(), "urn:user:7");
        assert!(primary_id("no-separator").is_err());
    }

    #[tokio::test]
    async fn should_find_id_by_exact_value() {
        // given
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("crm.db.users.idmguid.index");
        index.add_entry(&store, "G1", "U1", deadline()).await.unwrap();

        // when
        let found = index.find_by_prefix(&store, "G1", deadline()).await.unwrap();

        // then
        assert_eq!(found, Some("U1".to_string()));
    }

    #[tokio::test]
    async fn should_return_none_for_unknown_value() {
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");
        index.add_entry(&store, "G1", "U1", deadline()).await.unwrap();

        let found = index.find_by_prefix(&store, "nope", deadline()).await.unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn should_not_match_longer_value_sharing_prefix() {
        // given
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");
        index.add_entry(&store, "abc", "U2", deadline()).await.unwrap();

        // when
        let found = index.find_by_prefix(&store, "ab", deadline()).await.unwrap();

        // then
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn should_resolve_shorter_value_when_longer_one_sorts_first() {
        // given "ab!" sorts before "ab:" because '!' < ':'
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");
        index.add_entry(&store, "ab!", "U0", deadline()).await.unwrap();
        index.add_entry(&store, "ab", "U1", deadline()).await.unwrap();
        index.add_entry(&store, "abc", "U2", deadline()).await.unwrap();

        // when
        let found = index.find_by_prefix(&store, "ab", deadline()).await.unwrap();

        // then
        assert_eq!(found, Some("U1".to_string()));
    }

    #[tokio::test]
    async fn should_list_all_candidates_for_value() {
        // given
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");
        index.add_entry(&store, "G1", "U2", deadline()).await.unwrap();
        index.add_entry(&store, "G1", "U1", deadline()).await.unwrap();
        index.add_entry(&store, "G2", "U3", deadline()).await.unwrap();

        // when
        let ids = index.candidates(&store, "G1", deadline()).await.unwrap();

        // then
        assert_eq!(ids, vec!["U1", "U2"]);
    }

    #[tokio::test]
    async fn should_not_duplicate_identical_entries() {
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");

        assert!(index.add_entry(&store, "G1", "U1", deadline()).await.unwrap());
        assert!(!index.add_entry(&store, "G1", "U1", deadline()).await.unwrap());
        assert_eq!(index.candidates(&store, "G1", deadline()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_lookup_with_separator() {
        let store = StorageRecordStore::in_memory();
        let index = SecondaryIndex::new("idx");

        let result = index.find_by_prefix(&store, "G1:U1", deadline()).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
