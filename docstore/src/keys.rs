//! Store key derivation for collections.
//!
//! ```text
//! namespace:  <root>.<database>.<collection>
//! record:     <root>.<database>.<collection>.<id>
//! index:      <root>.<database>.<collection>.<attribute>.index
//! ```
//!
//! Segments are joined verbatim. An identifier containing the separator
//! produces a key that can collide with another namespace, so callers must
//! keep `.` out of database names, collection names and ids.

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '.';

/// Default first key segment.
pub const DEFAULT_ROOT: &str = "crm";

const INDEX_SUFFIX: &str = "index";

/// Key prefix shared by every record and index of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    path: String,
}

impl Namespace {
    pub fn new(root: &str, database: &str, collection: &str) -> Self {
        Self {
            path: join(&[root, database, collection]),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Key of the hash holding the fields of the record with primary id `id`.
    pub fn record_key(&self, id: &str) -> String {
        join(&[&self.path, id])
    }

    /// Key of the sorted set indexing the collection by `attribute`.
    pub fn index_key(&self, attribute: &str) -> String {
        join(&[&self.path, attribute, INDEX_SUFFIX])
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

fn join(segments: &[&str]) -> String {
    let mut key = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(segment);
    }
    key
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn should_build_namespace_path() {
        let ns = Namespace::new("crm", "sf-auth", "users");

        assert_eq!(ns.path(), "crm.sf-auth.users");
        assert_eq!(ns.to_string(), "crm.sf-auth.users");
    }

    #[test]
    fn should_build_record_key() {
        let ns = Namespace::new("crm", "sf-auth", "users");

        assert_eq!(ns.record_key("0051a000000ZYEPAA4"), "crm.sf-auth.users.0051a000000ZYEPAA4");
    }

    #[test]
    fn should_build_index_key() {
        let ns = Namespace::new("crm", "sf-auth", "users");

        assert_eq!(ns.index_key("idmguid"), "crm.sf-auth.users.idmguid.index");
    }

    #[test]
    fn should_derive_same_keys_for_same_inputs() {
        let a = Namespace::new("crm", "db", "tokens");
        let b = Namespace::new("crm", "db", "tokens");

        assert_eq!(a, b);
        assert_eq!(a.record_key("x"), b.record_key("x"));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,12}"
    }

    proptest! {
        #[test]
        fn should_derive_distinct_record_keys_for_distinct_triples(
            a in (segment(), segment(), segment()),
            b in (segment(), segment(), segment()),
        ) {
            prop_assume!(a != b);

            let key_a = Namespace::new("crm", &a.0, &a.1).record_key(&a.2);
            let key_b = Namespace::new("crm", &b.0, &b.1).record_key(&b.2);

            prop_assert_ne!(key_a, key_b);
        }
    }
}
