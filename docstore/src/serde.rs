//! Storage key layout for hashes and sorted sets.
//!
//! Every store structure is spread over individual records of the ordered
//! keyspace. The store key is embedded as terminated bytes so that records of
//! key `"a"` never fall inside a scan for key `"ab"`.
//!
//! ```text
//! hash field:      | 0x01 | 0x10 | key (terminated) | field            | -> value
//! sorted entry:    | 0x01 | 0x20 | key (terminated) | score (8) | member | -> empty
//! sorted score:    | 0x01 | 0x30 | key (terminated) | member           | -> score (8)
//! ```
//!
//! Sorted entries keep members in (score, member) order. The score records
//! map a member back to its current score, so re-adding a member can replace
//! its entry instead of duplicating it.

use bytes::{BufMut, Bytes, BytesMut};
use common::BytesRange;
use common::serde::key_prefix::{KeyPrefix, RecordTag};
use common::serde::sortable::{decode_f64_sortable, encode_f64_sortable};
use common::serde::terminated_bytes;

use crate::error::{Error, Result};

/// Key format version.
pub const KEY_VERSION: u8 = 0x01;

pub const HASH_FIELD: KeyPrefix = KeyPrefix::new(KEY_VERSION, RecordTag::new(0x01));
pub const SORTED_ENTRY: KeyPrefix = KeyPrefix::new(KEY_VERSION, RecordTag::new(0x02));
pub const SORTED_SCORE: KeyPrefix = KeyPrefix::new(KEY_VERSION, RecordTag::new(0x03));

const SCORE_LEN: usize = 8;

fn encode_base(prefix: KeyPrefix, key: &str, extra: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(2 + key.len() + 1 + extra);
    prefix.write_to(&mut buf);
    terminated_bytes::serialize(key.as_bytes(), &mut buf);
    buf
}

/// Strips the prefix and embedded store key, returning the remaining bytes.
fn decode_base<'a>(prefix: KeyPrefix, storage_key: &'a [u8]) -> Result<&'a [u8]> {
    KeyPrefix::expect(storage_key, prefix)?;
    let mut rest = &storage_key[2..];
    terminated_bytes::deserialize(&mut rest)?;
    Ok(rest)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Encoding(format!("{} is not valid UTF-8: {}", what, e)))
}

/// Range covering every record of one structure.
pub fn structure_range(prefix: KeyPrefix, key: &str) -> BytesRange {
    BytesRange::prefix(encode_base(prefix, key, 0).freeze())
}

pub fn encode_hash_field_key(key: &str, field: &str) -> Bytes {
    let mut buf = encode_base(HASH_FIELD, key, field.len());
    buf.put_slice(field.as_bytes());
    buf.freeze()
}

/// Returns the field name of a hash field record.
pub fn decode_hash_field_key(storage_key: &[u8]) -> Result<String> {
    let field = decode_base(HASH_FIELD, storage_key)?;
    utf8(field, "hash field")
}

pub fn encode_sorted_entry_key(key: &str, score: f64, member: &str) -> Bytes {
    let mut buf = encode_base(SORTED_ENTRY, key, SCORE_LEN + member.len());
    buf.put_u64(encode_f64_sortable(score));
    buf.put_slice(member.as_bytes());
    buf.freeze()
}

/// Returns the score and member of a sorted entry record.
pub fn decode_sorted_entry_key(storage_key: &[u8]) -> Result<(f64, String)> {
    let rest = decode_base(SORTED_ENTRY, storage_key)?;
    if rest.len() < SCORE_LEN {
        return Err(Error::Encoding(format!(
            "sorted entry too short: expected at least {} bytes after key, got {}",
            SCORE_LEN,
            rest.len()
        )));
    }
    let (score, member) = rest.split_at(SCORE_LEN);
    let mut raw = [0u8; SCORE_LEN];
    raw.copy_from_slice(score);
    let score = decode_f64_sortable(u64::from_be_bytes(raw));
    Ok((score, utf8(member, "sorted set member")?))
}

pub fn encode_sorted_score_key(key: &str, member: &str) -> Bytes {
    let mut buf = encode_base(SORTED_SCORE, key, member.len());
    buf.put_slice(member.as_bytes());
    buf.freeze()
}

pub fn encode_score(score: f64) -> Bytes {
    Bytes::copy_from_slice(&score.to_be_bytes())
}

pub fn decode_score(value: &[u8]) -> Result<f64> {
    let raw: [u8; SCORE_LEN] = value.try_into().map_err(|_| {
        Error::Encoding(format!(
            "invalid score: expected {} bytes, got {}",
            SCORE_LEN,
            value.len()
        ))
    })?;
    Ok(f64::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_encode_hash_field_key() {
        // when
        let encoded = encode_hash_field_key("crm.db.users.U1", "idm_guid");

        // then
        assert_eq!(&encoded[..2], &[KEY_VERSION, 0x10]);
        assert_eq!(&encoded[2..18], b"crm.db.users.U1\x00");
        assert_eq!(&encoded[18..], b"idm_guid");
        assert_eq!(decode_hash_field_key(&encoded).unwrap(), "idm_guid");
    }

    #[test]
    fn should_keep_hash_fields_of_prefix_keys_apart() {
        // given
        let range = structure_range(HASH_FIELD, "crm.db.users.U1");

        // then
        assert!(range.contains(&encode_hash_field_key("crm.db.users.U1", "a")));
        assert!(!range.contains(&encode_hash_field_key("crm.db.users.U10", "a")));
        assert!(!range.contains(&encode_sorted_score_key("crm.db.users.U1", "a")));
    }

    #[test]
    fn should_roundtrip_sorted_entry_key() {
        let encoded = encode_sorted_entry_key("idx", -2.5, "G1:U1");

        let (score, member) = decode_sorted_entry_key(&encoded).unwrap();

        assert_eq!(score, -2.5);
        assert_eq!(member, "G1:U1");
    }

    #[test]
    fn should_order_sorted_entries_by_score_then_member() {
        let mut keys = vec![
            encode_sorted_entry_key("idx", 1.0, "a"),
            encode_sorted_entry_key("idx", 0.0, "b"),
            encode_sorted_entry_key("idx", 0.0, "a"),
            encode_sorted_entry_key("idx", -1.0, "z"),
        ];

        keys.sort();

        let decoded: Vec<_> = keys
            .iter()
            .map(|k| decode_sorted_entry_key(k).unwrap())
            .collect();
        assert_eq!(
            decoded,
            vec![
                (-1.0, "z".to_string()),
                (0.0, "a".to_string()),
                (0.0, "b".to_string()),
                (1.0, "a".to_string()),
            ]
        );
    }

    #[test]
    fn should_reject_entry_key_with_wrong_tag() {
        let encoded = encode_hash_field_key("idx", "field");

        let result = decode_sorted_entry_key(&encoded);

        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[test]
    fn should_reject_truncated_sorted_entry() {
        let mut buf = BytesMut::new();
        SORTED_ENTRY.write_to(&mut buf);
        buf.put_slice(b"idx\x00\x01\x02");

        let result = decode_sorted_entry_key(&buf);

        assert!(result.unwrap_err().to_string().contains("too short"));
    }

    #[test]
    fn should_roundtrip_score_value() {
        assert_eq!(decode_score(&encode_score(0.0)).unwrap(), 0.0);
        assert!(decode_score(b"abc").is_err());
    }
}
