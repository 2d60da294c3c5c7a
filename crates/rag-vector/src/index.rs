//! Vector index trait and types.

use rag_types::EmbeddingVector;

use crate::error::VectorError;

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Vector key, shared with the passage catalog
    pub id: u64,
    /// `1 - cosine distance` (higher = more similar)
    pub score: f32,
}

impl IndexHit {
    pub fn new(id: u64, score: f32) -> Self {
        Self { id, score }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Index file size in bytes
    pub size_bytes: u64,
}

/// Trait for vector indexes.
///
/// Implementations must be thread-safe for concurrent read access.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a vector with the given id.
    fn add(&mut self, id: u64, embedding: &EmbeddingVector) -> Result<(), VectorError>;

    /// Add multiple vectors in batch.
    fn add_batch(&mut self, vectors: &[(u64, EmbeddingVector)]) -> Result<(), VectorError> {
        for (id, embedding) in vectors {
            self.add(*id, embedding)?;
        }
        Ok(())
    }

    /// Search for the `k` nearest neighbors, best first.
    fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<IndexHit>, VectorError>;

    fn contains(&self, id: u64) -> bool;

    fn stats(&self) -> IndexStats;

    /// Persist the index to disk
    fn save(&self) -> Result<(), VectorError>;
}
