//! Document-side domain types.
//!
//! Two ownership-distinct entities meet here: [`SimilarityMatch`] (produced
//! per query by the similarity index) and [`DocumentRecord`] (owned by the
//! document store). [`FusedContextItem`] is the join of exactly one of each.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that carries a document's identifier inside a [`DocumentRecord`].
pub const IDENTIFIER_FIELD: &str = "document_id";

/// Optional free-text summary field used for prompts and index text.
pub const SUMMARY_FIELD: &str = "summary";

/// Optional ordered list of keywords used for prompts and index text.
pub const KEYWORDS_FIELD: &str = "key_words";

/// Opaque key shared by the similarity index and the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret a JSON value as an identifier.
    ///
    /// Strings and integers are accepted; anything else (null, objects,
    /// arrays, floats, empty strings) is not an identifier.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A ranked candidate returned by nearest-neighbor search.
///
/// Immutable once produced; lives for a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// Identifier of the document this match was indexed from.
    pub id: DocumentId,

    /// The indexed text snippet that matched.
    pub content: String,

    /// Similarity score. Direction is declared by the index's `ScoreOrder`.
    pub score: f32,

    /// Index-side attributes (keywords, etc.).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl SimilarityMatch {
    pub fn new(id: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            id: DocumentId::new(id),
            content: content.into(),
            score,
            attributes: Map::new(),
        }
    }
}

/// The authoritative stored representation of a document.
///
/// A record is an arbitrary JSON object. It is only useful to the engine
/// when it carries [`IDENTIFIER_FIELD`]; records without one are never
/// joined and are rejected on insert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRecord {
    pub fields: Map<String, Value>,
}

impl DocumentRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Build a record from a JSON value. Non-objects are not records.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// The record's identifier, if the identifier field is present and usable.
    pub fn id(&self) -> Option<DocumentId> {
        self.fields.get(IDENTIFIER_FIELD).and_then(DocumentId::from_value)
    }

    /// The summary text, or `""` when missing or not a string.
    pub fn summary(&self) -> &str {
        self.fields
            .get(SUMMARY_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Keywords in stored order. Non-string entries are skipped.
    pub fn keywords(&self) -> Vec<&str> {
        self.fields
            .get(KEYWORDS_FIELD)
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// One entry of the fused, ranked context list handed to prompt assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedContextItem {
    pub document: DocumentRecord,
    /// Snippet from the matching similarity hit.
    pub snippet: String,
    /// Score from the matching similarity hit.
    pub score: f32,
}

impl FusedContextItem {
    pub fn id(&self) -> Option<DocumentId> {
        self.document.id()
    }
}

/// Outcome of an insert into a keyed collaborator.
///
/// "Already present" is an expected, frequent outcome and is reported as a
/// value rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

impl InsertOutcome {
    pub fn inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> DocumentRecord {
        DocumentRecord::from_value(value).unwrap()
    }

    #[test]
    fn identifier_accepts_strings_and_integers() {
        assert_eq!(
            record(json!({"document_id": "doc-1"})).id(),
            Some(DocumentId::new("doc-1"))
        );
        assert_eq!(
            record(json!({"document_id": 42})).id(),
            Some(DocumentId::new("42"))
        );
    }

    #[test]
    fn identifier_rejects_missing_or_unusable_values() {
        assert!(record(json!({"summary": "no id"})).id().is_none());
        assert!(record(json!({"document_id": null})).id().is_none());
        assert!(record(json!({"document_id": "  "})).id().is_none());
        assert!(record(json!({"document_id": {"nested": 1}})).id().is_none());
        assert!(record(json!({"document_id": 1.5})).id().is_none());
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(DocumentRecord::from_value(json!(["a", "b"])).is_none());
        assert!(DocumentRecord::from_value(json!("doc")).is_none());
    }

    #[test]
    fn missing_summary_and_keywords_render_empty() {
        let r = record(json!({"document_id": "a"}));
        assert_eq!(r.summary(), "");
        assert!(r.keywords().is_empty());
    }

    #[test]
    fn keywords_keep_order_and_skip_non_strings() {
        let r = record(json!({
            "document_id": "a",
            "key_words": ["forms", 3, "domains", null, "validation"]
        }));
        assert_eq!(r.keywords(), vec!["forms", "domains", "validation"]);
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let r = record(json!({"document_id": "a", "summary": "s"}));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, json!({"document_id": "a", "summary": "s"}));
    }

    #[test]
    fn insert_outcome_serialization() {
        let json = serde_json::to_string(&InsertOutcome::AlreadyExists).unwrap();
        assert_eq!(json, "\"already_exists\"");
        assert!(InsertOutcome::Inserted.inserted());
        assert!(!InsertOutcome::AlreadyExists.inserted());
    }
}
