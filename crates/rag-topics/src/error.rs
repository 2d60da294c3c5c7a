//! Topic error types.

use thiserror::Error;

/// Errors that can occur during topic operations.
#[derive(Debug, Error, PartialEq)]
pub enum TopicsError {
    /// Vectors of different lengths
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector with no components
    #[error("Empty vector")]
    EmptyVector,

    /// All-zero vector; cosine similarity is undefined
    #[error("Zero vector: cosine similarity is undefined")]
    ZeroVector,

    /// Similarity came out as NaN or infinite
    #[error("Non-finite similarity")]
    NonFinite,
}
