//! Similarity index and document store implementations for ragchat.

pub mod embedder;
pub mod in_memory;
pub mod ingest;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

use ragchat_core::error::RetrievalError;

pub use embedder::Embedder;
pub use in_memory::{InMemoryDocumentStore, InMemoryIndex};
pub use ingest::{FileReport, IngestOutcome, Ingestor, index_text};
pub use vector::{cosine_distance, cosine_similarity};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentStore;

#[cfg(feature = "postgres")]
pub use postgres::{PgDocumentStore, PgVectorIndex};

/// Collection names become table names, so only plain identifiers pass.
pub(crate) fn table_name(collection: &str) -> Result<String, RetrievalError> {
    let mut chars = collection.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(collection.to_string())
    } else {
        Err(RetrievalError::Storage(format!(
            "invalid collection name '{collection}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert_eq!(table_name("wp_forms").unwrap(), "wp_forms");
        assert!(table_name("_private").is_ok());
        assert!(table_name("").is_err());
        assert!(table_name("9lives").is_err());
        assert!(table_name("a-b").is_err());
        assert!(table_name("x; DROP TABLE y").is_err());
    }
}
