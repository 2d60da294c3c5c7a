//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from text.

use rag_types::EmbeddingVector;

use crate::error::EmbeddingError;

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

/// Trait for embedding models.
///
/// Output must be deterministic for a fixed model and have a fixed
/// dimensionality. Implementations must be thread-safe (Send + Sync).
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch).
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
