//! In-memory backends: useful for testing and ephemeral sessions.
//!
//! [`InMemoryIndex`] embeds text through an [`Embedder`] and ranks by
//! brute-force cosine distance. [`InMemoryDocumentStore`] keeps records
//! keyed by identifier in insertion order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ragchat_core::document::{DocumentId, DocumentRecord, InsertOutcome, SimilarityMatch};
use ragchat_core::error::RetrievalError;
use ragchat_core::index::{IndexEntry, ScoreOrder, SimilarityIndex};
use ragchat_core::store::{DocumentStore, require_id};
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedder::Embedder;
use crate::vector;

struct EmbeddedEntry {
    entry: IndexEntry,
    embedding: Vec<f32>,
}

/// A similarity index that stores embeddings in a Vec.
pub struct InMemoryIndex {
    embedder: Embedder,
    entries: Arc<RwLock<Vec<EmbeddedEntry>>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Embedder) -> Self {
        Self {
            embedder,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn score_order(&self) -> ScoreOrder {
        ScoreOrder::Distance
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SimilarityMatch>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let entries = self.entries.read().await;

        let ranked = vector::rank_by_distance(
            entries.iter().map(|e| e.embedding.as_slice()),
            &query_embedding,
            k,
        );

        debug!(candidates = entries.len(), returned = ranked.len(), "In-memory search");

        Ok(ranked
            .into_iter()
            .map(|(i, distance)| {
                let entry = &entries[i].entry;
                SimilarityMatch {
                    id: entry.id.clone(),
                    content: entry.content.clone(),
                    score: distance,
                    attributes: entry.attributes.clone(),
                }
            })
            .collect())
    }

    async fn add(&self, entry: IndexEntry) -> Result<InsertOutcome, RetrievalError> {
        if self.contains(&entry.id).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let embedding = self.embedder.embed_one(&entry.content).await?;

        let mut entries = self.entries.write().await;
        // Re-check under the write lock; another add may have raced us.
        if entries.iter().any(|e| e.entry.id == entry.id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        entries.push(EmbeddedEntry { entry, embedding });
        Ok(InsertOutcome::Inserted)
    }

    async fn contains(&self, id: &DocumentId) -> Result<bool, RetrievalError> {
        Ok(self.entries.read().await.iter().any(|e| &e.entry.id == id))
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.entries.read().await.len())
    }
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<DocumentId, DocumentRecord>,
    order: Vec<DocumentId>,
}

/// A document store that keeps records in a HashMap.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in insertion order.
    pub async fn all(&self) -> Vec<DocumentRecord> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn fetch(&self, ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError> {
        let inner = self.inner.read().await;
        let mut seen = std::collections::HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    async fn insert(&self, record: DocumentRecord) -> Result<InsertOutcome, RetrievalError> {
        let id = require_id(&record)?;
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        inner.order.push(id.clone());
        inner.records.insert(id, record);
        Ok(InsertOutcome::Inserted)
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.inner.read().await.records.len())
    }
}
