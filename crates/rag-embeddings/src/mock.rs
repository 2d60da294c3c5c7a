//! Lookup-table embedder for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rag_types::EmbeddingVector;

use crate::error::EmbeddingError;
use crate::model::{EmbeddingModel, ModelInfo};

/// Embedder that returns fixed vectors for known texts.
///
/// Unknown texts get the fallback vector if one is set, otherwise an
/// `InvalidInput` error. Useful for testing without loading a model.
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    fail: bool,
    calls: AtomicUsize,
    info: ModelInfo,
}

impl StaticEmbedder {
    /// Create an empty embedder producing `dimension`-length vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: None,
            fail: false,
            calls: AtomicUsize::new(0),
            info: ModelInfo {
                name: "static".to_string(),
                dimension,
                max_sequence_length: usize::MAX,
            },
        }
    }

    /// Map `text` to `vector`.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Vector returned for texts without an entry.
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `embed` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for StaticEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(EmbeddingError::ModelNotFound("static embedder offline".to_string()));
        }

        let values = self
            .vectors
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidInput(format!("no vector for {:?}", text)))?;

        if values.len() != self.info.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.info.dimension,
                actual: values.len(),
            });
        }

        Ok(EmbeddingVector::new(values))
    }
}
