//! Vector similarity utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity and cosine distance
//! - Brute-force nearest-neighbor ranking over stored embeddings
//! - pgvector literal formatting

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance, `1 - cosine_similarity`. Lower is closer.
///
/// Matches pgvector's `<=>` operator, so both index backends report
/// scores on the same scale.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Rank embeddings by cosine distance to a query embedding.
///
/// Returns `(position, distance)` pairs, closest first. Ties keep their
/// input order.
pub fn rank_by_distance<'a, I>(embeddings: I, query: &[f32], limit: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scored: Vec<(usize, f32)> = embeddings
        .into_iter()
        .enumerate()
        .map(|(i, emb)| (i, cosine_distance(emb, query)))
        .collect();

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Format an embedding as a pgvector literal, e.g. `[0.1,0.2]`.
pub fn to_pgvector_literal(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}
