//! Similarity index trait: nearest-neighbor search over embedded text.
//!
//! The engine treats the index as an opaque service: given a query string
//! and a result count it returns ranked [`SimilarityMatch`]es. Each index
//! declares its score direction through [`ScoreOrder`] so that fusion sorts
//! consistently with the collaborator's contract.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{DocumentId, InsertOutcome, SimilarityMatch};
use crate::error::RetrievalError;

/// Which direction of score means "more similar".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Lower is more similar (cosine distance, L2 distance).
    #[default]
    Distance,
    /// Higher is more similar (cosine similarity, inner product).
    Affinity,
}

impl ScoreOrder {
    /// Order two scores best-first. NaN sorts as equal.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        match self {
            Self::Distance => ord,
            Self::Affinity => ord.reverse(),
        }
    }
}

/// Text to add to a similarity index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: DocumentId,
    /// Text that gets embedded and returned as the match snippet.
    pub content: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// The core SimilarityIndex trait.
///
/// Implementations: in-memory (brute-force cosine), PostgreSQL + pgvector.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// The backend name (e.g., "in_memory", "pgvector").
    fn name(&self) -> &str;

    /// Score semantics of [`SimilarityMatch::score`] for this index.
    fn score_order(&self) -> ScoreOrder {
        ScoreOrder::Distance
    }

    /// Return up to `k` matches, best first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SimilarityMatch>, RetrievalError>;

    /// Index a document's text. Already-indexed identifiers are left untouched.
    async fn add(&self, entry: IndexEntry) -> Result<InsertOutcome, RetrievalError>;

    /// Whether an identifier has been indexed.
    async fn contains(&self, id: &DocumentId) -> Result<bool, RetrievalError>;

    /// Number of indexed entries.
    async fn count(&self) -> Result<usize, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_orders_ascending() {
        assert_eq!(ScoreOrder::Distance.compare(0.1, 0.3), Ordering::Less);
        assert_eq!(ScoreOrder::Distance.compare(0.3, 0.1), Ordering::Greater);
    }

    #[test]
    fn affinity_orders_descending() {
        assert_eq!(ScoreOrder::Affinity.compare(0.9, 0.2), Ordering::Less);
        assert_eq!(ScoreOrder::Affinity.compare(0.2, 0.9), Ordering::Greater);
    }

    #[test]
    fn nan_compares_equal() {
        assert_eq!(ScoreOrder::Distance.compare(f32::NAN, 0.5), Ordering::Equal);
    }

    #[test]
    fn default_is_distance() {
        assert_eq!(ScoreOrder::default(), ScoreOrder::Distance);
    }
}
