//!
//! Tag document store
//! ------------------
//! Point lookups for the `/api/validar` route. Documents are JSON objects carrying at
//! least a `uid` field; the Postgres backend keeps them in a `doc JSONB` column of the
//! configured collection table. The in-memory backend has the same contract and is used
//! when the relay is embedded without a database.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio_postgres::NoTls;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store disabled")]
    Disabled,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Short classification safe to show to HTTP clients.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Disabled => "disabled",
            StoreError::Connect(_) => "connection error",
            StoreError::Query(_) => "query error",
        }
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

/// Projection of a matched tag document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDocument {
    pub proprietario: Option<String>,
    pub departamento: Option<String>,
}

impl TagDocument {
    pub fn owned_by<S: Into<String>>(proprietario: S) -> Self {
        Self { proprietario: Some(proprietario.into()), departamento: None }
    }
}

pub enum TagStore {
    Postgres(PgTagStore),
    Memory(MemoryTagStore),
}

impl TagStore {
    /// Exact-match single-document lookup on `uid`.
    pub async fn find_by_uid(&self, uid: &str) -> Result<Option<TagDocument>, StoreError> {
        match self {
            TagStore::Postgres(pg) => pg.find_by_uid(uid).await,
            TagStore::Memory(mem) => Ok(mem.find_by_uid(uid)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            TagStore::Postgres(_) => "postgres",
            TagStore::Memory(_) => "memory",
        }
    }
}

pub struct PgTagStore {
    client: tokio_postgres::Client,
    lookup_sql: String,
}

impl PgTagStore {
    /// Connect once and verify the collection is readable. `collection` must already be a
    /// validated plain identifier; it is spliced into the statement text.
    pub async fn connect(dsn: &str, collection: &str, timeout: Duration) -> Result<Self, StoreError> {
        let (client, connection) = tokio::time::timeout(timeout, tokio_postgres::connect(dsn, NoTls))
            .await
            .map_err(|_| StoreError::Connect(format!("timed out after {} ms", timeout.as_millis())))?
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(target: "store", "postgres connection error: {}", e);
            }
        });
        client
            .simple_query(&format!("SELECT 1 FROM {collection} LIMIT 1"))
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        info!(target: "store", collection = %collection, "connected to document store");
        Ok(Self { client, lookup_sql: lookup_sql(collection) })
    }

    async fn find_by_uid(&self, uid: &str) -> Result<Option<TagDocument>, StoreError> {
        let row = self.client.query_opt(self.lookup_sql.as_str(), &[&uid]).await?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(TagDocument {
            proprietario: row.try_get::<_, Option<String>>(0)?,
            departamento: row.try_get::<_, Option<String>>(1)?,
        }))
    }
}

fn lookup_sql(collection: &str) -> String {
    format!("SELECT doc->>'proprietario', doc->>'departamento' FROM {collection} WHERE doc->>'uid' = $1 LIMIT 1")
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTagStore {
    docs: HashMap<String, TagDocument>,
}

impl MemoryTagStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert<S: Into<String>>(&mut self, uid: S, doc: TagDocument) {
        self.docs.insert(uid.into(), doc);
    }

    pub fn with<S: Into<String>>(mut self, uid: S, doc: TagDocument) -> Self {
        self.insert(uid, doc);
        self
    }

    fn find_by_uid(&self, uid: &str) -> Option<TagDocument> {
        self.docs.get(uid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_statement_targets_uid_field() {
        let sql = lookup_sql("tags");
        assert!(sql.contains("FROM tags"));
        assert!(sql.contains("doc->>'uid' = $1"));
        assert!(sql.ends_with("LIMIT 1"));
    }

    #[tokio::test]
    async fn memory_store_exact_match() {
        let store = TagStore::Memory(MemoryTagStore::new().with("04A1B2C3", TagDocument::owned_by("Carla")));
        let hit = store.find_by_uid("04A1B2C3").await.unwrap();
        assert_eq!(hit.and_then(|d| d.proprietario).as_deref(), Some("Carla"));
        assert!(store.find_by_uid("04a1b2c3").await.unwrap().is_none());
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let res = PgTagStore::connect("host=127.0.0.1 port=1 user=x dbname=x connect_timeout=1", "tags", Duration::from_secs(2)).await;
        assert!(matches!(res, Err(StoreError::Connect(_))));
    }

    // Needs a reachable PostgreSQL in DATABASE_URL; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn postgres_lookup_handles_missing_fields() {
        let Ok(dsn) = std::env::var("DATABASE_URL") else { return };
        let (admin, conn) = tokio_postgres::connect(&dsn, NoTls).await.unwrap();
        tokio::spawn(conn);
        admin
            .batch_execute(
                "DROP TABLE IF EXISTS relay_tags_it;
                 CREATE TABLE relay_tags_it (doc JSONB NOT NULL);
                 INSERT INTO relay_tags_it VALUES
                   ('{\"uid\": \"04A1B2C3\", \"proprietario\": \"Carla\", \"departamento\": \"TI\"}'),
                   ('{\"uid\": \"04FFEE00\"}');",
            )
            .await
            .unwrap();

        let store = TagStore::Postgres(PgTagStore::connect(&dsn, "relay_tags_it", Duration::from_secs(5)).await.unwrap());
        assert_eq!(store.backend_name(), "postgres");

        let full = store.find_by_uid("04A1B2C3").await.unwrap().unwrap();
        assert_eq!(full.proprietario.as_deref(), Some("Carla"));
        assert_eq!(full.departamento.as_deref(), Some("TI"));

        let bare = store.find_by_uid("04FFEE00").await.unwrap().unwrap();
        assert_eq!((bare.proprietario, bare.departamento), (None, None));

        assert!(store.find_by_uid("04a1b2c3").await.unwrap().is_none());

        admin.batch_execute("DROP TABLE relay_tags_it").await.unwrap();
    }
}
