//! Document store trait: lookup of full document records by identifier.

use async_trait::async_trait;

use crate::document::{DocumentId, DocumentRecord, InsertOutcome};
use crate::error::RetrievalError;

/// The core DocumentStore trait.
///
/// Implementations: in-memory, SQLite, PostgreSQL (JSONB).
///
/// Identifiers are unique within a store: inserting a record whose
/// identifier already exists is rejected with [`InsertOutcome::AlreadyExists`],
/// never overwritten.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "in_memory", "sqlite", "postgres").
    fn name(&self) -> &str;

    /// Fetch the records for a set of identifiers.
    ///
    /// Identifiers with no stored record are simply absent from the result.
    async fn fetch(&self, ids: &[DocumentId]) -> Result<Vec<DocumentRecord>, RetrievalError>;

    /// Insert a record.
    ///
    /// Fails with [`RetrievalError::InvalidRecord`] if the record has no identifier.
    async fn insert(&self, record: DocumentRecord) -> Result<InsertOutcome, RetrievalError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, RetrievalError>;
}

/// Pull the identifier out of a record about to be inserted.
pub fn require_id(record: &DocumentRecord) -> Result<DocumentId, RetrievalError> {
    record.id().ok_or_else(|| {
        RetrievalError::InvalidRecord(format!(
            "record must contain a '{}' field",
            crate::document::IDENTIFIER_FIELD
        ))
    })
}
