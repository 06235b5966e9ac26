// Semantic-equivalence scoring between verifier summaries, computed
// as cosine similarity over their embedding vectors.

use serde::{Deserialize, Serialize};

/// Outcome of comparing two semantic summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquivalenceResult {
    pub are_equivalent: bool,
    pub cosine_similarity: f64,
    pub threshold: f64,
}

/// Cosine similarity of two vectors. Mismatched dimensions or a zero
/// vector score 0 rather than erroring; an absent embedding carries no
/// semantic signal.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Compare two summaries by their embeddings. The summary strings are
/// accepted for symmetry with the wire contract but the score comes
/// entirely from the vectors.
pub fn check_semantic_equivalence(
    _summary_a: &str,
    embedding_a: &[f32],
    _summary_b: &str,
    embedding_b: &[f32],
    threshold: f64,
) -> EquivalenceResult {
    let cosine_similarity = cosine_similarity(embedding_a, embedding_b);
    EquivalenceResult {
        are_equivalent: cosine_similarity >= threshold,
        cosine_similarity,
        threshold,
    }
}
