//! HNSW index implementation using usearch.
//!
//! Cosine metric, so `1 - distance` is the cosine similarity of the hit.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use rag_types::EmbeddingVector;
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{IndexHit, IndexStats, VectorIndex};

const INDEX_FILE: &str = "hnsw.usearch";

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match model)
    pub dimension: usize,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Directory holding the index file
    pub index_path: PathBuf,
    /// Initial capacity; grows on demand
    pub capacity: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: 384, // all-MiniLM-L6-v2
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            index_path: PathBuf::from("./vector-index"),
            capacity: 10_000,
        }
    }
}

impl HnswConfig {
    pub fn new(dimension: usize, index_path: impl Into<PathBuf>) -> Self {
        Self {
            dimension,
            index_path: index_path.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false,
        }
    }
}

/// HNSW index wrapper around usearch.
pub struct HnswIndex {
    index: RwLock<Index>,
    config: HnswConfig,
}

impl HnswIndex {
    /// Create a new HNSW index or open an existing one.
    pub fn open_or_create(config: HnswConfig) -> Result<Self, VectorError> {
        let index_file = config.index_path.join(INDEX_FILE);
        let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;

        if index_file.exists() {
            info!(path = ?index_file, "Opening existing vector index");
            index
                .load(path_str(&index_file)?)
                .map_err(|e| VectorError::Index(format!("Failed to load: {}", e)))?;

            if index.dimensions() != config.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: config.dimension,
                    actual: index.dimensions(),
                });
            }
        } else {
            info!(path = ?index_file, dim = config.dimension, "Creating new vector index");
            std::fs::create_dir_all(&config.index_path)?;
            index
                .reserve(config.capacity)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        Ok(Self {
            index: RwLock::new(index),
            config,
        })
    }

    /// Get the index file path
    pub fn index_file(&self) -> PathBuf {
        self.config.index_path.join(INDEX_FILE)
    }

    fn check_dimension(&self, embedding: &EmbeddingVector) -> Result<(), VectorError> {
        if embedding.dimension() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }
}

fn path_str(path: &std::path::Path) -> Result<&str, VectorError> {
    path.to_str()
        .ok_or_else(|| VectorError::Index("Invalid path encoding".to_string()))
}

/// Reserve room for `additional` more vectors, doubling when full.
fn ensure_capacity(index: &Index, additional: usize) -> Result<(), VectorError> {
    let needed = index.size() + additional;
    if needed > index.capacity() {
        let target = needed.max(index.capacity() * 2);
        debug!(capacity = target, "Growing vector index");
        index
            .reserve(target)
            .map_err(|e| VectorError::Index(e.to_string()))?;
    }
    Ok(())
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .size()
    }

    #[allow(clippy::readonly_write_lock)] // usearch::Index uses interior mutability
    fn add(&mut self, id: u64, embedding: &EmbeddingVector) -> Result<(), VectorError> {
        self.check_dimension(embedding)?;

        let index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        ensure_capacity(&index, 1)?;
        index
            .add(id, embedding.as_slice())
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(id, "Added vector");
        Ok(())
    }

    #[allow(clippy::readonly_write_lock)]
    fn add_batch(&mut self, vectors: &[(u64, EmbeddingVector)]) -> Result<(), VectorError> {
        for (_, embedding) in vectors {
            self.check_dimension(embedding)?;
        }

        let index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        ensure_capacity(&index, vectors.len())?;
        for (id, embedding) in vectors {
            index
                .add(*id, embedding.as_slice())
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        debug!(count = vectors.len(), "Added vector batch");
        Ok(())
    }

    fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<IndexHit>, VectorError> {
        self.check_dimension(query)?;

        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        if index.size() == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let results = index
            .search(query.as_slice(), k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let hits: Vec<IndexHit> = results
            .keys
            .iter()
            .zip(results.distances.iter())
            .map(|(&id, &dist)| IndexHit::new(id, 1.0 - dist))
            .collect();

        debug!(k, found = hits.len(), "Search complete");
        Ok(hits)
    }

    fn contains(&self, id: u64) -> bool {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn stats(&self) -> IndexStats {
        let size_bytes = std::fs::metadata(self.index_file())
            .map(|m| m.len())
            .unwrap_or(0);

        IndexStats {
            vector_count: self.len(),
            dimension: self.config.dimension,
            size_bytes,
        }
    }

    fn save(&self) -> Result<(), VectorError> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        let path = self.index_file();
        index
            .save(path_str(&path)?)
            .map_err(|e| VectorError::Index(format!("Failed to save: {}", e)))?;

        info!(path = ?path, vectors = index.size(), "Saved vector index");
        Ok(())
    }
}
