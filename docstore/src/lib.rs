//! Docstore - document collections over hash and sorted-set primitives.
//!
//! Docstore gives document-store-like access (named collections, lookup by
//! primary key, lookup by one secondary attribute) on top of a store that only
//! offers flat hash records and lexicographic range scans over sorted sets.
//!
//! # Architecture
//!
//! Each document is written as one hash whose fields are string renderings of
//! the document's attributes. A collection may designate one secondary
//! attribute; inserts then add a `value:id` member with score 0 to a sorted
//! set, and lookups by that attribute become a lexicographic range scan.
//!
//! Keys are dot-separated paths:
//!
//! ```text
//! record:  <root>.<database>.<collection>.<id>
//! index:   <root>.<database>.<collection>.<attribute>.index
//! ```
//!
//! # Key Concepts
//!
//! - **Database**: The entry point, holding configuration and the record store.
//! - **Collection**: Insert and lookup for one document type.
//! - **Document**: Trait mapping an entity to and from a field map.
//! - **RecordStore**: The four hash and sorted-set operations collections use.
//!   [`StorageRecordStore`] provides them over any ordered [`common::Storage`].
//!
//! # Example
//!
//! ```ignore
//! use docstore::{Config, Database, User};
//!
//! let db = Database::open(Config::default()).await?;
//! let users = db.users();
//!
//! users.insert(&User {
//!     idm_org_id: 1,
//!     idm_guid: "G1".to_string(),
//!     crm_user_id: "U1".to_string(),
//!     access: true,
//!     ..Default::default()
//! }).await?;
//!
//! let user = users.find_by_secondary_attribute("G1").await?;
//! assert_eq!(user.map(|u| u.crm_user_id), Some("U1".to_string()));
//! ```

mod codec;
mod collection;
mod config;
mod database;
mod error;
mod index;
mod keys;
mod model;
mod serde;
mod store;

pub use codec::{Document, FieldMap, FieldReader, FieldWriter, NumericPolicy};
pub use collection::Collection;
pub use config::{Config, OperationOptions};
pub use database::{Database, REFRESH_TOKENS, TOKEN_CACHE, USERS};
pub use error::{Error, Result};
pub use index::{INDEX_SCORE, INDEX_SEPARATOR, SecondaryIndex};
pub use keys::{DEFAULT_ROOT, KEY_SEPARATOR, Namespace};
pub use model::{Token, User};
pub use store::{Deadline, LexBound, RecordStore, StorageRecordStore};
