//! Embedding adapter.
//!
//! Embedders hand back whatever vector-like value their runtime produces: a
//! plain `Vec<f32>`, a `Vec<f64>`, a tensor. Anything that can convert itself
//! into a list of floats implements [`IntoEmbeddingVector`]; everything else
//! has to already be an [`EmbeddingVector`].
//!
//! Inference is CPU-bound. Async callers go through [`embed_on_blocking_pool`]
//! so a forward pass never occupies a runtime worker.

use std::sync::Arc;

use rag_types::EmbeddingVector;
use tracing::debug;

use crate::error::EmbeddingError;
use crate::model::EmbeddingModel;

/// List-conversion capability for embedder outputs.
pub trait IntoEmbeddingVector {
    /// Convert into an ordered sequence of `f32`.
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError>;
}

impl IntoEmbeddingVector for EmbeddingVector {
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(self)
    }
}

impl IntoEmbeddingVector for Vec<f32> {
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(EmbeddingVector::new(self))
    }
}

impl IntoEmbeddingVector for Vec<f64> {
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(EmbeddingVector::new(
            self.into_iter().map(|v| v as f32).collect(),
        ))
    }
}

impl IntoEmbeddingVector for &[f32] {
    fn into_embedding_vector(self) -> Result<EmbeddingVector, EmbeddingError> {
        Ok(EmbeddingVector::new(self.to_vec()))
    }
}

/// Run `embedder` on `text` and coerce its output to an [`EmbeddingVector`].
///
/// No retry: an embedder failure is returned as-is.
pub fn embed<F, V>(embedder: F, text: &str) -> Result<EmbeddingVector, EmbeddingError>
where
    F: FnOnce(&str) -> Result<V, EmbeddingError>,
    V: IntoEmbeddingVector,
{
    let raw = embedder(text)?;
    let vector = raw.into_embedding_vector()?;
    debug!(
        text_len = text.len(),
        dim = vector.dimension(),
        "Embedded text"
    );
    Ok(vector)
}

/// [`embed`] with `embedder` on tokio's blocking thread pool.
pub async fn embed_on_blocking_pool<E>(
    embedder: Arc<E>,
    text: &str,
) -> Result<EmbeddingVector, EmbeddingError>
where
    E: EmbeddingModel + ?Sized + 'static,
{
    let text = text.to_owned();
    tokio::task::spawn_blocking(move || embed(|t| embedder.embed(t), &text))
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    use crate::model::ModelInfo;

    /// Remembers which thread ran the last `embed`.
    struct ThreadRecorder {
        info: ModelInfo,
        thread: Mutex<Option<ThreadId>>,
    }

    impl EmbeddingModel for ThreadRecorder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
            *self.thread.lock().unwrap() = Some(std::thread::current().id());
            Ok(EmbeddingVector::new(vec![1.0, 0.0]))
        }
    }

    #[test]
    fn test_embed_passes_vector_through() {
        let v = embed(|_| Ok(EmbeddingVector::new(vec![0.1, 0.2])), "hello").unwrap();
        assert_eq!(v.as_slice(), &[0.1, 0.2]);
    }

    #[test]
    fn test_embed_converts_f64_list() {
        let v = embed(|_| Ok(vec![0.5f64, -0.25]), "hello").unwrap();
        assert_eq!(v.as_slice(), &[0.5f32, -0.25]);
    }

    #[test]
    fn test_embed_converts_slice() {
        let raw = [1.0f32, 2.0, 3.0];
        let v = embed(|_| Ok(&raw[..]), "hello").unwrap();
        assert_eq!(v.dimension(), 3);
    }

    #[test]
    fn test_embed_accepts_empty_text() {
        let v = embed(|t: &str| Ok(vec![t.len() as f32]), "").unwrap();
        assert_eq!(v.as_slice(), &[0.0]);
    }

    #[test]
    fn test_embed_propagates_failure() {
        let result = embed::<_, Vec<f32>>(
            |_| Err(EmbeddingError::InvalidInput("model offline".to_string())),
            "hello",
        );
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_blocking_pool_runs_off_runtime_thread() {
        let embedder = Arc::new(ThreadRecorder {
            info: ModelInfo {
                name: "recorder".to_string(),
                dimension: 2,
                max_sequence_length: 16,
            },
            thread: Mutex::new(None),
        });

        let v = embed_on_blocking_pool(embedder.clone(), "hello").await.unwrap();
        assert_eq!(v.as_slice(), &[1.0, 0.0]);

        // current-thread runtime: the test body runs on the only worker
        let ran_on = embedder.thread.lock().unwrap().unwrap();
        assert_ne!(ran_on, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_blocking_pool_propagates_failure() {
        let embedder = Arc::new(crate::mock::StaticEmbedder::new(2).failing());
        let result = embed_on_blocking_pool(embedder, "hello").await;
        assert!(matches!(result, Err(EmbeddingError::ModelNotFound(_))));
    }
}
