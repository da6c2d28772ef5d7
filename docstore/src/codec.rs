//! Conversion between typed documents and flat field maps.
//!
//! A document is stored as a hash of string fields. Scalars are written in
//! their canonical string form: integers in decimal, booleans as `"1"`/`"0"`.
//! Absent optional fields are left out of the map instead of being stored
//! empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Flat field name to string value mapping stored at a record key.
pub type FieldMap = BTreeMap<String, String>;

const TRUE_MARKER: &str = "1";
const FALSE_MARKER: &str = "0";

/// A typed entity that can be stored in a [`Collection`](crate::Collection).
pub trait Document: Sized + Send + Sync {
    /// Name of the secondary index maintained for this type, if any.
    ///
    /// The name becomes part of the index key, see
    /// [`Namespace::index_key`](crate::keys::Namespace::index_key).
    const INDEX_NAME: Option<&'static str> = None;

    /// Primary identifier; addresses the record within its collection.
    fn id(&self) -> &str;

    /// Value of the indexed attribute, `None` when the type has no index or
    /// the value is absent.
    fn indexed_value(&self) -> Option<&str> {
        None
    }

    fn encode(&self) -> FieldMap;

    fn decode(fields: &FieldReader<'_>) -> Result<Self>;
}

/// How malformed integer fields are treated on decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Fail the read with [`Error::Encoding`].
    #[default]
    Strict,
    /// Read the field as zero, matching records written by legacy clients.
    Lenient,
}

/// Builds a [`FieldMap`] one field at a time.
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: FieldMap,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn optional_string(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.string(name, value),
            None => self,
        }
    }

    pub fn int(mut self, name: &str, value: i64) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn optional_int(self, name: &str, value: Option<i64>) -> Self {
        match value {
            Some(value) => self.int(name, value),
            None => self,
        }
    }

    pub fn bool(mut self, name: &str, value: bool) -> Self {
        let marker = if value { TRUE_MARKER } else { FALSE_MARKER };
        self.fields.insert(name.to_string(), marker.to_string());
        self
    }

    pub fn finish(self) -> FieldMap {
        self.fields
    }
}

/// Typed read access to a [`FieldMap`].
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    fields: &'a FieldMap,
    policy: NumericPolicy,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a FieldMap, policy: NumericPolicy) -> Self {
        Self { fields, policy }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Missing fields read as the empty string.
    pub fn string(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    pub fn optional_string(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    /// Missing fields read as zero.
    pub fn int(&self, name: &str) -> Result<i64> {
        Ok(self.optional_int(name)?.unwrap_or(0))
    }

    pub fn optional_int(&self, name: &str) -> Result<Option<i64>> {
        let Some(raw) = self.get(name) else {
            return Ok(None);
        };
        match raw.parse::<i64>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.policy {
                NumericPolicy::Strict => Err(Error::Encoding(format!(
                    "field {} is not an integer: {:?} ({})",
                    name, raw, e
                ))),
                NumericPolicy::Lenient => {
                    tracing::warn!(field = name, value = raw, "coercing malformed integer to 0");
                    Ok(Some(0))
                }
            },
        }
    }

    /// Only the literal `"1"` reads as true; every other value, and a missing
    /// field, reads as false.
    pub fn bool(&self, name: &str) -> bool {
        self.get(name) == Some(TRUE_MARKER)
    }
}
