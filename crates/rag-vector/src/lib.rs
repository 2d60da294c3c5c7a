//! # rag-vector
//!
//! Passage retrieval for the topic-aware RAG pipeline.
//!
//! ## Features
//! - `VectorStore` contract: `search(query, top_k)` returning scored passages
//!   in rank order, with `score = 1 - cosine distance`
//! - usearch-powered HNSW index with file persistence
//! - RocksDB catalog mapping vector ids to passage text
//! - Directory ingestion: character-window chunking, short-chunk filtering,
//!   batched embedding and insertion
//! - `MockVectorStore` for tests

pub mod catalog;
pub mod error;
pub mod hnsw;
pub mod index;
pub mod ingest;
pub mod mock;
pub mod store;

pub use catalog::{Passage, PassageCatalog, CF_PASSAGES};
pub use error::VectorError;
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{IndexHit, IndexStats, VectorIndex};
pub use ingest::{
    chunk_text, load_documents, split_documents, IngestStats, PendingPassage, SourceDocument,
};
pub use mock::MockVectorStore;
pub use store::{SemanticStore, StoreStats, VectorStore};
