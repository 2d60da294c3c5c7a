//! Vector store contract and the embedded semantic store.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use rag_embeddings::EmbeddingModel;
use rag_types::{EmbeddingVector, IngestSettings, RetrievedDocument};

use crate::catalog::{Passage, PassageCatalog};
use crate::error::VectorError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::index::VectorIndex;
use crate::ingest::{load_documents, split_documents, IngestStats, PendingPassage};

/// Nearest-neighbor passage search.
///
/// Results come back in rank order, best first, at most `top_k` of them.
/// `score` must be on the `1 - cosine distance` scale so that it can be
/// compared against a fixed confidence threshold.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(&self, query: &str, top_k: usize)
        -> Result<Vec<RetrievedDocument>, VectorError>;
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub vector_count: usize,
    pub passage_count: usize,
    pub dimension: usize,
    pub index_size_bytes: u64,
    pub model: String,
}

/// Local vector store: embedder + HNSW index + passage catalog.
///
/// Layout under the store directory: `hnsw.usearch` and `catalog/`.
pub struct SemanticStore<E: EmbeddingModel + ?Sized> {
    embedder: Arc<E>,
    index: Arc<RwLock<HnswIndex>>,
    catalog: Arc<PassageCatalog>,
}

impl<E: EmbeddingModel + ?Sized> SemanticStore<E> {
    /// Open or create a store whose dimension follows the embedder.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<E>) -> Result<Self, VectorError> {
        let path = path.as_ref();
        let dimension = embedder.info().dimension;

        let index = HnswIndex::open_or_create(HnswConfig::new(dimension, path))?;
        let catalog = PassageCatalog::open(path.join("catalog"))?;

        info!(path = ?path, dimension, vectors = index.len(), "Opened semantic store");
        Ok(Self {
            embedder,
            index: Arc::new(RwLock::new(index)),
            catalog: Arc::new(catalog),
        })
    }

    /// Embed and insert passages in batches of `batch_size`.
    ///
    /// Ids continue after the highest id already stored. The index is not
    /// saved; call [`SemanticStore::save`] when done.
    pub fn add_passages(
        &self,
        passages: &[PendingPassage],
        batch_size: usize,
    ) -> Result<usize, VectorError> {
        let mut next_id = self
            .catalog
            .next_id()?
            .max(self.read_index().len() as u64);
        let mut added = 0;

        for batch in passages.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|p| p.content.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts)?;

            let mut records = Vec::with_capacity(batch.len());
            let mut vectors = Vec::with_capacity(batch.len());
            for (pending, embedding) in batch.iter().zip(embeddings) {
                records.push(
                    Passage::new(next_id, pending.content.clone())
                        .with_source(Some(pending.source.clone())),
                );
                vectors.push((next_id, embedding));
                next_id += 1;
            }

            // Catalog first: an index hit must always resolve to a passage.
            self.catalog.put_batch(&records)?;
            self.index
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .add_batch(&vectors)?;

            added += batch.len();
            debug!(batch = batch.len(), total = added, "Inserted passage batch");
        }

        Ok(added)
    }

    /// Load, chunk, embed and index every supported file under `dir`.
    pub fn ingest_dir(
        &self,
        dir: impl AsRef<Path>,
        settings: &IngestSettings,
    ) -> Result<IngestStats, VectorError> {
        let dir = dir.as_ref();
        info!(path = ?dir, "Starting ingestion");

        let (documents, files_skipped) = load_documents(dir)?;
        let (passages, chunks_dropped) = split_documents(&documents, settings);

        let mut stats = IngestStats {
            files_read: documents.len(),
            files_skipped,
            chunks_total: passages.len() + chunks_dropped,
            chunks_dropped,
            passages_added: 0,
        };

        if passages.is_empty() {
            warn!(path = ?dir, "No passages to ingest");
            return Ok(stats);
        }

        stats.passages_added = self.add_passages(&passages, settings.batch_size)?;
        self.save()?;

        info!(
            files = stats.files_read,
            skipped = stats.files_skipped,
            chunks = stats.chunks_total,
            dropped = stats.chunks_dropped,
            added = stats.passages_added,
            "Ingestion complete"
        );
        Ok(stats)
    }

    pub fn save(&self) -> Result<(), VectorError> {
        self.read_index().save()
    }

    pub fn stats(&self) -> Result<StoreStats, VectorError> {
        let index_stats = self.read_index().stats();
        Ok(StoreStats {
            vector_count: index_stats.vector_count,
            passage_count: self.catalog.count()?,
            dimension: index_stats.dimension,
            index_size_bytes: index_stats.size_bytes,
            model: self.embedder.info().name.clone(),
        })
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, HnswIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Index hits joined with their catalog passages, in rank order.
fn search_embedding(
    index: &RwLock<HnswIndex>,
    catalog: &PassageCatalog,
    query: &EmbeddingVector,
    top_k: usize,
) -> Result<Vec<RetrievedDocument>, VectorError> {
    let hits = index
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .search(query, top_k)?;

    hits.into_iter()
        .map(|hit| {
            let passage = catalog
                .get(hit.id)?
                .ok_or(VectorError::MissingPassage(hit.id))?;
            Ok(RetrievedDocument::new(passage.content, hit.score))
        })
        .collect()
}

#[async_trait]
impl<E: EmbeddingModel + ?Sized + 'static> VectorStore for SemanticStore<E> {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, VectorError> {
        // Embedding, index search and catalog reads all block.
        let embedder = Arc::clone(&self.embedder);
        let index = Arc::clone(&self.index);
        let catalog = Arc::clone(&self.catalog);
        let text = query.to_owned();
        let documents = tokio::task::spawn_blocking(move || -> Result<_, VectorError> {
            let embedding = embedder.embed(&text)?;
            search_embedding(&index, &catalog, &embedding, top_k)
        })
        .await
        .map_err(|e| VectorError::Task(e.to_string()))??;

        debug!(
            query_len = query.len(),
            top_k,
            found = documents.len(),
            best = documents.first().map(|d| d.score),
            "Vector search complete"
        );
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_embeddings::StaticEmbedder;
    use tempfile::TempDir;

    fn pending(content: &str) -> PendingPassage {
        PendingPassage {
            source: "test.txt".to_string(),
            content: content.to_string(),
        }
    }

    fn embedder() -> Arc<StaticEmbedder> {
        Arc::new(
            StaticEmbedder::new(3)
                .with_vector("ownership", vec![1.0, 0.0, 0.0])
                .with_vector("lifetimes", vec![0.8, 0.6, 0.0])
                .with_vector("gardening", vec![0.0, 0.0, 1.0])
                .with_vector("who owns a value?", vec![1.0, 0.0, 0.0]),
        )
    }

    #[tokio::test]
    async fn test_search_returns_ranked_passages() {
        let temp = TempDir::new().unwrap();
        let store = SemanticStore::open(temp.path(), embedder()).unwrap();
        let added = store
            .add_passages(
                &[pending("ownership"), pending("lifetimes"), pending("gardening")],
                2,
            )
            .unwrap();
        assert_eq!(added, 3);

        let docs = store.search("who owns a value?", 2).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "ownership");
        assert!((docs[0].score - 1.0).abs() < 1e-4);
        assert_eq!(docs[1].content, "lifetimes");
        assert!((docs[1].score - 0.8).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = SemanticStore::open(temp.path(), embedder()).unwrap();
        assert!(store.search("ownership", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hit_without_passage_is_error() {
        let temp = TempDir::new().unwrap();
        let store = SemanticStore::open(temp.path(), embedder()).unwrap();
        store
            .index
            .write()
            .unwrap()
            .add(99, &EmbeddingVector::new(vec![1.0, 0.0, 0.0]))
            .unwrap();

        let result = store.search("ownership", 1).await;
        assert!(matches!(result, Err(VectorError::MissingPassage(99))));
    }

    #[tokio::test]
    async fn test_embedder_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let store =
            SemanticStore::open(temp.path(), Arc::new(StaticEmbedder::new(3).failing())).unwrap();
        let result = store.search("anything", 5).await;
        assert!(matches!(result, Err(VectorError::Embedding(_))));
    }

    #[test]
    fn test_ids_continue_after_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = SemanticStore::open(temp.path(), embedder()).unwrap();
            store.add_passages(&[pending("ownership")], 10).unwrap();
            store.save().unwrap();
        }

        let store = SemanticStore::open(temp.path(), embedder()).unwrap();
        store.add_passages(&[pending("gardening")], 10).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.vector_count, 2);
        assert_eq!(stats.passage_count, 2);
        assert_eq!(stats.dimension, 3);
        assert!(store.catalog.get(1).unwrap().is_some());
    }

    #[test]
    fn test_ingest_dir() {
        let docs = TempDir::new().unwrap();
        std::fs::write(docs.path().join("rust.txt"), "r".repeat(500)).unwrap();
        std::fs::write(docs.path().join("tiny.md"), "too short").unwrap();
        std::fs::write(docs.path().join("image.png"), b"png").unwrap();

        let temp = TempDir::new().unwrap();
        let embedder = Arc::new(StaticEmbedder::new(3).with_fallback(vec![0.0, 1.0, 0.0]));
        let store = SemanticStore::open(temp.path(), embedder).unwrap();

        let stats = store
            .ingest_dir(docs.path(), &IngestSettings::default())
            .unwrap();
        // 500 chars at 400/80 give windows at 0 and 320; the second is 180 chars.
        assert_eq!(
            stats,
            IngestStats {
                files_read: 2,
                files_skipped: 1,
                chunks_total: 3,
                chunks_dropped: 1,
                passages_added: 2,
            }
        );
        assert!(store.read_index().index_file().exists());
        assert_eq!(store.stats().unwrap().passage_count, 2);
    }

    /// Remembers which thread ran the last `embed`.
    struct ThreadRecorder {
        inner: StaticEmbedder,
        thread: std::sync::Mutex<Option<std::thread::ThreadId>>,
    }

    impl EmbeddingModel for ThreadRecorder {
        fn info(&self) -> &rag_embeddings::ModelInfo {
            self.inner.info()
        }

        fn embed(&self, text: &str) -> Result<EmbeddingVector, rag_embeddings::EmbeddingError> {
            *self.thread.lock().unwrap() = Some(std::thread::current().id());
            self.inner.embed(text)
        }
    }

    #[tokio::test]
    async fn test_search_runs_off_runtime_thread() {
        let temp = TempDir::new().unwrap();
        let embedder = Arc::new(ThreadRecorder {
            inner: StaticEmbedder::new(3).with_fallback(vec![1.0, 0.0, 0.0]),
            thread: std::sync::Mutex::new(None),
        });
        let store = SemanticStore::open(temp.path(), embedder.clone()).unwrap();
        store.add_passages(&[pending("ownership")], 10).unwrap();
        *embedder.thread.lock().unwrap() = None;

        let docs = store.search("who owns a value?", 1).await.unwrap();
        assert_eq!(docs[0].content, "ownership");

        // current-thread runtime: the test body runs on the only worker
        let ran_on = embedder.thread.lock().unwrap().unwrap();
        assert_ne!(ran_on, std::thread::current().id());
    }
}
