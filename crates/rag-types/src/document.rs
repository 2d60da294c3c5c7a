//! Retrieved passage type.

use serde::{Deserialize, Serialize};

/// A passage returned by the vector store.
///
/// `score` is `1 - cosine distance` for the stores in this workspace. It is
/// only bounded to [0, 1] when the store's metric is cosine distance in [0, 2]
/// and the passage is not anti-correlated with the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Passage text
    pub content: String,
    /// Similarity-derived score (higher = closer)
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
        }
    }
}
