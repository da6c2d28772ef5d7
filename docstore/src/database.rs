//! Entry point tying configuration, the record store and collections together.

use std::sync::Arc;

use common::storage::factory::create_storage;

use crate::codec::Document;
use crate::collection::Collection;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::keys::Namespace;
use crate::model::{Token, User};
use crate::store::{RecordStore, StorageRecordStore};

/// Collection holding [`User`] records.
pub const USERS: &str = "users";
/// Collection holding cached access [`Token`]s.
pub const TOKEN_CACHE: &str = "token_cache";
/// Collection holding refresh [`Token`]s.
pub const REFRESH_TOKENS: &str = "refresh_tokens";

/// A named database of document collections.
///
/// # Example
///
/// ```ignore
/// use docstore::{Config, Database, User};
///
/// let db = Database::open(Config::default()).await?;
/// let users = db.users();
///
/// users.insert(&user).await?;
/// let by_id = users.find_by_primary_key("U1").await?;
/// let by_guid = users.find_by_secondary_attribute("G1").await?;
///
/// db.close().await?;
/// ```
pub struct Database {
    store: Arc<dyn RecordStore>,
    config: Config,
}

impl Database {
    /// Opens a database over the storage backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be initialized or the
    /// configuration names no database.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = create_storage(&config.storage).await?;
        Self::with_store(Arc::new(StorageRecordStore::new(storage)), config)
    }

    /// Opens a database over an existing record store.
    pub fn with_store(store: Arc<dyn RecordStore>, config: Config) -> Result<Self> {
        if config.database.is_empty() {
            return Err(Error::InvalidInput("database name must not be empty".to_string()));
        }
        tracing::debug!(root = %config.root, database = %config.database, "opened database");
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the collection `name` holding documents of type `D`.
    pub fn collection<D: Document>(&self, name: &str) -> Collection<D> {
        Collection::new(
            self.store.clone(),
            Namespace::new(&self.config.root, &self.config.database, name),
            self.config.op_timeout,
            self.config.numeric_policy,
        )
    }

    pub fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    pub fn token_cache(&self) -> Collection<Token> {
        self.collection(TOKEN_CACHE)
    }

    pub fn refresh_tokens(&self) -> Collection<Token> {
        self.collection(REFRESH_TOKENS)
    }

    /// Closes the underlying store.
    pub async fn close(self) -> Result<()> {
        self.store.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, guid: &str) -> User {
        User {
            idm_org_id: 7,
            idm_guid: guid.to_string(),
            crm_organization_id: Some("ORG1".to_string()),
            crm_user_id: id.to_string(),
            access: true,
            sandbox: false,
            api_instance_url: None,
        }
    }

    #[tokio::test]
    async fn should_open_in_memory_database() {
        // given
        let db = Database::open(Config::default()).await.unwrap();

        // when
        db.users().insert(&user("U1", "G1")).await.unwrap();

        // then
        let found = db.users().find_by_secondary_attribute("G1").await.unwrap();
        assert_eq!(found, Some(user("U1", "G1")));
        db.close().await.unwrap();
    }

    #[test]
    fn should_build_collection_namespaces_from_config() {
        let config = Config {
            root: "app".to_string(),
            database: "auth".to_string(),
            ..Config::default()
        };
        let db = Database::with_store(Arc::new(StorageRecordStore::in_memory()), config).unwrap();

        assert_eq!(db.users().namespace().path(), "app.auth.users");
        assert_eq!(db.token_cache().namespace().path(), "app.auth.token_cache");
        assert_eq!(
            db.refresh_tokens().namespace().path(),
            "app.auth.refresh_tokens"
        );
        assert_eq!(
            db.users().index().map(|i| i.key()),
            Some("app.auth.users.idmguid.index")
        );
    }

    #[test]
    fn should_reject_empty_database_name() {
        let config = Config {
            database: String::new(),
            ..Config::default()
        };

        let result = Database::with_store(Arc::new(StorageRecordStore::in_memory()), config);

        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_keep_token_collections_separate() {
        // given
        let db = Database::open(Config::default()).await.unwrap();
        let token = Token {
            crm_organization_id: Some("ORG1".to_string()),
            crm_user_id: "U1".to_string(),
            token: Some("access".to_string()),
            encrypted_token: None,
            failure_count: Some(0),
        };

        // when
        db.token_cache().insert(&token).await.unwrap();

        // then
        assert_eq!(
            db.token_cache().find_by_primary_key("U1").await.unwrap(),
            Some(token)
        );
        assert_eq!(db.refresh_tokens().find_by_primary_key("U1").await.unwrap(), None);
    }
}
