//! SQLite document store.
//!
//! Each collection is one table keyed by document identifier, with the
//! record kept verbatim as JSON text:
//!
//! ```sql
//! CREATE TABLE <collection> (
//!     document_id TEXT PRIMARY KEY,
//!     body        TEXT NOT NULL,
//!     created_at  TEXT NOT NULL
//! )
//! ```

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use ragchat_core::document::{DocumentId, DocumentRecord, InsertOutcome};
use ragchat_core::error::RetrievalError;
use ragchat_core::store::{DocumentStore, require_id};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::table_name;

/// A document store backed by a single SQLite database file.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteDocumentStore {
    /// Open (or create) a store at `url` using `collection` as table name.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn connect(url: &str, collection: &str) -> Result<Self, RetrievalError> {
        let table = table_name(collection)?;
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| RetrievalError::StoreUnavailable(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // An in-memory database lives and dies with its connection.
        let ephemeral = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if ephemeral { 1 } else { 4 });
        if ephemeral {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::StoreUnavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool, table };
        store.run_migrations().await?;
        info!(url, table = %store.table, "SQLite document store initialized");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool, collection: &str) -> Result<Self, RetrievalError> {
        let store = Self {
            pool,
            table: table_name(collection)?,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), RetrievalError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                document_id TEXT PRIMARY KEY,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )",
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("{} table: {e}", self.table)))?;

        debug!(table = %self.table, "SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch(&self, ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT body FROM {} WHERE document_id IN ({placeholders})",
            self.table
        );

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RetrievalError::FetchFailed(format!("SELECT failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let body: String = row
                    .try_get("body")
                    .map_err(|e| RetrievalError::FetchFailed(format!("body column: {e}")))?;
                let fields = serde_json::from_str(&body)
                    .map_err(|e| RetrievalError::FetchFailed(format!("corrupt record: {e}")))?;
                Ok(DocumentRecord::new(fields))
            })
            .collect()
    }

    async fn insert(&self, record: DocumentRecord) -> Result<InsertOutcome, RetrievalError> {
        let id = require_id(&record)?;
        let body = serde_json::to_string(&record)
            .map_err(|e| RetrievalError::InvalidRecord(e.to_string()))?;

        let sql = format!(
            "INSERT INTO {} (document_id, body, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(document_id) DO NOTHING",
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("INSERT failed: {e}")))?;

        if result.rows_affected() == 0 {
            debug!(document_id = %id, "Document already stored");
            Ok(InsertOutcome::AlreadyExists)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::FetchFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| RetrievalError::FetchFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
