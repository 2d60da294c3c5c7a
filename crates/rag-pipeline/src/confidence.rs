//! Confidence gate.

use rag_types::RetrievedDocument;

/// Highest score among `docs`, or `None` when empty.
pub fn best_score(docs: &[RetrievedDocument]) -> Option<f32> {
    docs.iter().map(|d| d.score).reduce(f32::max)
}

/// Whether the retrieved evidence is strong enough to answer.
///
/// False for an empty list, otherwise `best >= min_score`.
pub fn is_confident(docs: &[RetrievedDocument], min_score: f32) -> bool {
    best_score(docs).is_some_and(|best| best >= min_score)
}
