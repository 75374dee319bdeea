//! PostgreSQL backends: a pgvector similarity index and a JSONB document store.
//!
//! The index ranks with pgvector's `<=>` operator (cosine distance, lower
//! is closer). Both backends create their tables on first use; the index
//! additionally requires the `vector` extension to be installed:
//!
//! ```sql
//! CREATE EXTENSION IF NOT EXISTS vector;
//! ```
//!
//! # Feature gate
//!
//! This module is behind the `postgres` feature flag:
//!
//! ```toml
//! ragchat-retrieval = { workspace = true, features = ["postgres"] }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::{debug, info};

use ragchat_core::document::{DocumentId, DocumentRecord, InsertOutcome, SimilarityMatch};
use ragchat_core::error::RetrievalError;
use ragchat_core::index::{IndexEntry, ScoreOrder, SimilarityIndex};
use ragchat_core::store::{DocumentStore, require_id};

use crate::embedder::Embedder;
use crate::table_name;
use crate::vector::to_pgvector_literal;

/// Open a connection pool.
pub async fn connect_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Similarity index stored in a pgvector table.
pub struct PgVectorIndex {
    pool: PgPool,
    table: String,
    embedder: Embedder,
    dimensions: usize,
}

impl PgVectorIndex {
    /// Connect, verify the `vector` extension and create the collection table.
    pub async fn connect(
        database_url: &str,
        collection: &str,
        embedder: Embedder,
        dimensions: usize,
    ) -> Result<Self, RetrievalError> {
        let pool = connect_pool(database_url).await.map_err(|e| {
            RetrievalError::IndexUnavailable(format!("PostgreSQL connection failed: {e}"))
        })?;

        let index = Self::from_pool(pool, collection, embedder, dimensions)?;
        index.verify_extension().await?;
        index.migrate().await?;
        info!(table = %index.table, dimensions, "pgvector index ready");
        Ok(index)
    }

    /// Create from an existing pool. Does not touch the database.
    pub fn from_pool(
        pool: PgPool,
        collection: &str,
        embedder: Embedder,
        dimensions: usize,
    ) -> Result<Self, RetrievalError> {
        Ok(Self {
            pool,
            table: table_name(collection)?,
            embedder,
            dimensions,
        })
    }

    async fn verify_extension(&self) -> Result<(), RetrievalError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM pg_extension WHERE extname = 'vector') AS installed")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::IndexUnavailable(format!("extension check failed: {e}")))?;

        let installed: bool = row
            .try_get("installed")
            .map_err(|e| RetrievalError::IndexUnavailable(e.to_string()))?;

        if !installed {
            return Err(RetrievalError::IndexUnavailable(
                "pgvector extension is not installed (run CREATE EXTENSION vector)".into(),
            ));
        }
        Ok(())
    }

    /// Create the collection table if missing.
    pub async fn migrate(&self) -> Result<(), RetrievalError> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             document_id TEXT PRIMARY KEY, \
             content TEXT NOT NULL, \
             attributes TEXT NOT NULL DEFAULT '{{}}', \
             embedding vector({}) NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
            self.table, self.dimensions
        )
    }

    fn search_sql(&self) -> String {
        format!(
            "SELECT document_id, content, attributes, \
             (embedding <=> $1::vector)::real AS score \
             FROM {} \
             ORDER BY embedding <=> $1::vector ASC, created_at ASC \
             LIMIT $2",
            self.table
        )
    }
}

fn row_to_match(row: &PgRow) -> Result<SimilarityMatch, RetrievalError> {
    let column = |e: sqlx::Error| RetrievalError::SearchFailed(format!("bad row: {e}"));

    let id: String = row.try_get("document_id").map_err(column)?;
    let content: String = row.try_get("content").map_err(column)?;
    let attributes: String = row.try_get("attributes").map_err(column)?;
    let score: f32 = row.try_get("score").map_err(column)?;

    Ok(SimilarityMatch {
        id: DocumentId::new(id),
        content,
        score,
        attributes: parse_attributes(&attributes)?,
    })
}

fn parse_attributes(raw: &str) -> Result<Map<String, Value>, RetrievalError> {
    serde_json::from_str(raw)
        .map_err(|e| RetrievalError::SearchFailed(format!("bad attributes column: {e}")))
}

#[async_trait]
impl SimilarityIndex for PgVectorIndex {
    fn name(&self) -> &str {
        "pgvector"
    }

    fn score_order(&self) -> ScoreOrder {
        ScoreOrder::Distance
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SimilarityMatch>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).await?;
        let rows = sqlx::query(&self.search_sql())
            .bind(to_pgvector_literal(&embedding))
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RetrievalError::SearchFailed(format!("Vector search failed: {e}")))?;

        debug!(table = %self.table, returned = rows.len(), "pgvector search");
        rows.iter().map(row_to_match).collect()
    }

    async fn add(&self, entry: IndexEntry) -> Result<InsertOutcome, RetrievalError> {
        if self.contains(&entry.id).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let embedding = self.embedder.embed_one(&entry.content).await?;
        if embedding.len() != self.dimensions {
            return Err(RetrievalError::Storage(format!(
                "embedding has {} dimensions, index expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        let attributes = serde_json::to_string(&entry.attributes)
            .map_err(|e| RetrievalError::InvalidRecord(e.to_string()))?;

        let sql = format!(
            "INSERT INTO {} (document_id, content, attributes, embedding) \
             VALUES ($1, $2, $3, $4::vector) \
             ON CONFLICT (document_id) DO NOTHING",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(entry.id.as_str())
            .bind(&entry.content)
            .bind(attributes)
            .bind(to_pgvector_literal(&embedding))
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to index document: {e}")))?;

        debug!(document_id = %entry.id, "Indexed document");
        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn contains(&self, id: &DocumentId) -> Result<bool, RetrievalError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE document_id = $1) AS found",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::SearchFailed(format!("Lookup failed: {e}")))?;

        row.try_get("found")
            .map_err(|e| RetrievalError::SearchFailed(e.to_string()))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        count_rows(&self.pool, &self.table).await
    }
}

/// Document store keeping each record as JSONB.
pub struct PgDocumentStore {
    pool: PgPool,
    table: String,
}

impl PgDocumentStore {
    /// Connect and create the collection table.
    pub async fn connect(database_url: &str, collection: &str) -> Result<Self, RetrievalError> {
        let pool = connect_pool(database_url).await.map_err(|e| {
            RetrievalError::StoreUnavailable(format!("PostgreSQL connection failed: {e}"))
        })?;
        let store = Self::from_pool(pool, collection)?;
        store.migrate().await?;
        info!(table = %store.table, "PostgreSQL document store ready");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool, collection: &str) -> Result<Self, RetrievalError> {
        Ok(Self {
            pool,
            table: table_name(collection)?,
        })
    }

    pub async fn migrate(&self) -> Result<(), RetrievalError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             document_id TEXT PRIMARY KEY, \
             body JSONB NOT NULL, \
             created_at TIMESTAMPTZ NOT NULL)",
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn fetch(&self, ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
        let sql = format!(
            "SELECT body::text AS body FROM {} WHERE document_id = ANY($1)",
            self.table
        );
        let rows = sqlx::query(&sql)
            .bind(&keys)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RetrievalError::FetchFailed(format!("Fetch failed: {e}")))?;

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
            "INSERT INTO {} (document_id, body, created_at) VALUES ($1, $2::jsonb, $3) \
             ON CONFLICT (document_id) DO NOTHING",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(body)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to store document: {e}")))?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        count_rows(&self.pool, &self.table).await
    }
}

async fn count_rows(pool: &PgPool, table: &str) -> Result<usize, RetrievalError> {
    let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {table}"))
        .fetch_one(pool)
        .await
        .map_err(|e| RetrievalError::FetchFailed(format!("Failed to count rows: {e}")))?;

    let count: i64 = row
        .try_get("cnt")
        .map_err(|e| RetrievalError::FetchFailed(e.to_string()))?;
    Ok(count as usize)
}

// ── Unit tests (no DB required) ──────────────────────────────────────────
