//! Vector store error types.

use thiserror::Error;

/// Errors that can occur during vector store operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RocksDB error
    #[error("Database error: {0}")]
    Database(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Index hit with no catalog entry
    #[error("Passage {0} is in the index but missing from the catalog")]
    MissingPassage(u64),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] rag_embeddings::EmbeddingError),

    /// Blocking search task panicked or was cancelled
    #[error("Search task failed: {0}")]
    Task(String),

    /// Store unavailable or failing
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
}
