//! Document ingestion: JSON records into the document store and the
//! similarity index.
//!
//! A record must carry `document_id`. The full record goes to the store;
//! the index receives `"Summary: …\nKeywords: …"` text with the identifier
//! and keywords as attributes. Each side reports its own [`InsertOutcome`],
//! so re-ingesting a file is harmless.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragchat_core::document::{DocumentId, DocumentRecord, IDENTIFIER_FIELD, InsertOutcome};
use ragchat_core::error::RetrievalError;
use ragchat_core::index::{IndexEntry, SimilarityIndex};
use ragchat_core::store::DocumentStore;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Ingested {
        id: DocumentId,
        store: InsertOutcome,
        index: InsertOutcome,
    },
    Rejected {
        reason: String,
    },
}

impl IngestOutcome {
    /// True when nothing new was written anywhere.
    pub fn already_present(&self) -> bool {
        matches!(
            self,
            Self::Ingested {
                store: InsertOutcome::AlreadyExists,
                index: InsertOutcome::AlreadyExists,
                ..
            }
        )
    }
}

/// Per-file result of a directory ingestion.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<IngestOutcome, RetrievalError>,
}

/// Writes documents into a store/index pair.
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SimilarityIndex>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn DocumentStore>, index: Arc<dyn SimilarityIndex>) -> Self {
        Self { store, index }
    }

    /// Ingest one parsed JSON document.
    pub async fn ingest_value(&self, value: Value) -> Result<IngestOutcome, RetrievalError> {
        let Some(record) = DocumentRecord::from_value(value) else {
            return Ok(rejected("document must be a JSON object"));
        };
        let Some(id) = record.id() else {
            return Ok(rejected(format!(
                "document must contain a '{IDENTIFIER_FIELD}' field"
            )));
        };

        let entry = index_entry(&id, &record);

        let store = self.store.insert(record).await?;
        let index = self.index.add(entry).await?;

        debug!(document_id = %id, ?store, ?index, "Ingested document");
        Ok(IngestOutcome::Ingested { id, store, index })
    }

    /// Ingest a JSON file. Unreadable or malformed files are rejected,
    /// not errors.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome, RetrievalError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => return Ok(rejected(format!("cannot read {}: {e}", path.display()))),
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => return Ok(rejected(format!("invalid JSON in {}: {e}", path.display()))),
        };
        self.ingest_value(value).await
    }

    /// Ingest every `*.json` file in a directory, in file-name order.
    ///
    /// One failing file never aborts the batch.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<Vec<FileReport>, RetrievalError> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| RetrievalError::Storage(format!("cannot read {}: {e}", dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RetrievalError::Storage(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.ingest_file(&path).await;
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "Ingestion failed");
            }
            reports.push(FileReport { path, result });
        }

        info!(dir = %dir.display(), files = reports.len(), "Directory ingested");
        Ok(reports)
    }
}

fn rejected(reason: impl Into<String>) -> IngestOutcome {
    IngestOutcome::Rejected {
        reason: reason.into(),
    }
}

/// The text indexed for a record: its summary and keywords.
pub fn index_text(record: &DocumentRecord) -> String {
    format!(
        "Summary: {}\nKeywords: {}",
        record.summary(),
        record.keywords().join(", ")
    )
}

fn index_entry(id: &DocumentId, record: &DocumentRecord) -> IndexEntry {
    let mut attributes = Map::new();
    attributes.insert(IDENTIFIER_FIELD.into(), json!(id.as_str()));
    attributes.insert("keywords".into(), json!(record.keywords()));

    IndexEntry {
        id: id.clone(),
        content: index_text(record),
        attributes,
    }
}
