//! Pipeline error type.

use thiserror::Error;

/// A turn that could not be completed.
///
/// Collaborator failures are wrapped as-is. Nothing is retried and no
/// fallback answer is produced; the caller keeps its previous state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] rag_embeddings::EmbeddingError),

    #[error("Topic comparison failed: {0}")]
    Topics(#[from] rag_topics::TopicsError),

    #[error("Language model failed: {0}")]
    Llm(#[from] rag_llm::LlmError),

    #[error("Vector store failed: {0}")]
    Vector(#[from] rag_vector::VectorError),

    /// A collaborator returned a record that cannot be used
    #[error("Malformed record: {0}")]
    Schema(String),
}
