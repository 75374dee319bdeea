//! Retrieval fusion: join similarity matches to document records.
//!
//! Fusion is a pure inner join on document identifier:
//!
//! 1. Matches are keyed by identifier; a later duplicate overwrites an
//!    earlier one.
//! 2. Each record is looked up by its identifier. Records without an
//!    identifier, without a match, or repeating an identifier already
//!    emitted are dropped.
//! 3. The surviving items are sorted best-first in the index's score
//!    direction. Equal scores keep the order of the winning matches.
//!
//! Nothing here performs I/O and nothing here fails.

use std::collections::{HashMap, HashSet};

use ragchat_core::document::{DocumentId, DocumentRecord, FusedContextItem, SimilarityMatch};
use ragchat_core::index::ScoreOrder;

/// Fuse with distance semantics (lower score = more similar).
pub fn fuse(matches: &[SimilarityMatch], records: Vec<DocumentRecord>) -> Vec<FusedContextItem> {
    fuse_with_order(matches, records, ScoreOrder::Distance)
}

/// Fuse, sorting in the direction declared by the similarity index.
pub fn fuse_with_order(
    matches: &[SimilarityMatch],
    records: Vec<DocumentRecord>,
    order: ScoreOrder,
) -> Vec<FusedContextItem> {
    if matches.is_empty() {
        return Vec::new();
    }

    // identifier -> (position in matches, snippet, score), last write wins
    let mut by_id: HashMap<&DocumentId, (usize, &str, f32)> = HashMap::with_capacity(matches.len());
    for (position, m) in matches.iter().enumerate() {
        by_id.insert(&m.id, (position, m.content.as_str(), m.score));
    }

    let mut emitted: HashSet<DocumentId> = HashSet::new();
    let mut fused: Vec<(usize, FusedContextItem)> = records
        .into_iter()
        .filter_map(|document| {
            let id = document.id()?;
            let &(position, snippet, score) = by_id.get(&id)?;
            if !emitted.insert(id) {
                return None;
            }
            Some((
                position,
                FusedContextItem {
                    document,
                    snippet: snippet.to_string(),
                    score,
                },
            ))
        })
        .collect();

    fused.sort_by(|(pa, a), (pb, b)| order.compare(a.score, b.score).then(pa.cmp(pb)));
    fused.into_iter().map(|(_, item)| item).collect()
}

/// Unique identifiers of a match list, in first-seen order.
pub fn match_ids(matches: &[SimilarityMatch]) -> Vec<DocumentId> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|m| seen.insert(&m.id))
        .map(|m| m.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> DocumentRecord {
        DocumentRecord::from_value(json!({"document_id": id, "summary": format!("summary {id}")}))
            .unwrap()
    }

    fn ids(items: &[FusedContextItem]) -> Vec<String> {
        items.iter().map(|i| i.id().unwrap().0).collect()
    }

    #[test]
    fn unmatched_records_are_dropped() {
        let matches = vec![
            SimilarityMatch::new("a", "snippet a", 0.1),
            SimilarityMatch::new("b", "snippet b", 0.3),
        ];
        let fused = fuse(&matches, vec![record("a"), record("c")]);

        assert_eq!(ids(&fused), vec!["a"]);
        assert_eq!(fused[0].snippet, "snippet a");
        assert_eq!(fused[0].score, 0.1);
    }

    #[test]
    fn empty_matches_give_empty_output() {
        assert!(fuse(&[], vec![record("a")]).is_empty());
    }

    #[test]
    fn sorted_ascending_by_distance() {
        let matches = vec![
            SimilarityMatch::new("far", "", 0.9),
            SimilarityMatch::new("near", "", 0.05),
            SimilarityMatch::new("mid", "", 0.4),
        ];
        let fused = fuse(&matches, vec![record("mid"), record("far"), record("near")]);
        assert_eq!(ids(&fused), vec!["near", "mid", "far"]);
    }

    #[test]
    fn affinity_sorts_descending() {
        let matches = vec![
            SimilarityMatch::new("low", "", 0.2),
            SimilarityMatch::new("high", "", 0.95),
        ];
        let fused = fuse_with_order(&matches, vec![record("low"), record("high")], ScoreOrder::Affinity);
        assert_eq!(ids(&fused), vec!["high", "low"]);
    }

    #[test]
    fn ties_follow_match_order() {
        let matches = vec![
            SimilarityMatch::new("x", "", 0.5),
            SimilarityMatch::new("y", "", 0.5),
            SimilarityMatch::new("z", "", 0.5),
        ];
        // Records arrive in a different order than the matches.
        let fused = fuse(&matches, vec![record("z"), record("x"), record("y")]);
        assert_eq!(ids(&fused), vec!["x", "y", "z"]);
    }

    #[test]
    fn duplicate_matches_last_write_wins() {
        let matches = vec![
            SimilarityMatch::new("a", "first", 0.1),
            SimilarityMatch::new("b", "only", 0.2),
            SimilarityMatch::new("a", "second", 0.7),
        ];
        let fused = fuse(&matches, vec![record("a"), record("b")]);

        assert_eq!(ids(&fused), vec!["b", "a"]);
        assert_eq!(fused[1].snippet, "second");
        assert_eq!(fused[1].score, 0.7);
    }

    #[test]
    fn duplicate_records_emitted_once() {
        let matches = vec![SimilarityMatch::new("a", "", 0.1)];
        let fused = fuse(&matches, vec![record("a"), record("a")]);
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn records_without_identifier_are_dropped() {
        let matches = vec![SimilarityMatch::new("a", "", 0.1)];
        let anonymous = DocumentRecord::from_value(json!({"summary": "no id"})).unwrap();
        let fused = fuse(&matches, vec![anonymous, record("a")]);
        assert_eq!(ids(&fused), vec!["a"]);
    }

    #[test]
    fn integer_identifiers_join_with_string_matches() {
        let matches = vec![SimilarityMatch::new("42", "", 0.1)];
        let numeric = DocumentRecord::from_value(json!({"document_id": 42})).unwrap();
        assert_eq!(fuse(&matches, vec![numeric]).len(), 1);
    }

    #[test]
    fn join_is_exact_for_many_inputs() {
        let matches: Vec<SimilarityMatch> = (0..20)
            .map(|i| SimilarityMatch::new(format!("m{}", i % 7), "", (i % 5) as f32 / 10.0))
            .collect();
        let records: Vec<DocumentRecord> = (0..10)
            .flat_map(|i| [record(&format!("m{i}")), record(&format!("m{i}"))])
            .collect();

        let fused = fuse(&matches, records);

        let mut got = ids(&fused);
        got.sort();
        let mut expected: Vec<String> = (0..7).map(|i| format!("m{i}")).collect();
        expected.sort();
        assert_eq!(got, expected);
        assert!(fused.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn match_ids_are_unique_in_order() {
        let matches = vec![
            SimilarityMatch::new("b", "", 0.1),
            SimilarityMatch::new("a", "", 0.2),
            SimilarityMatch::new("b", "", 0.3),
        ];
        let ids: Vec<String> = match_ids(&matches).into_iter().map(|id| id.0).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
