//! # rag-embeddings
//!
//! Text embedding for the topic-aware RAG pipeline.
//!
//! ## Features
//! - `EmbeddingModel` trait: text in, fixed-length vector out
//! - `embed` adapter that coerces any vector-like embedder output into an
//!   [`EmbeddingVector`](rag_types::EmbeddingVector)
//! - Local inference via Candle (all-MiniLM-L6-v2 by default, 384 dimensions)
//! - Model files fetched once from the HuggingFace Hub, then read from disk
//! - `StaticEmbedder` lookup table for tests and offline runs

pub mod adapter;
pub mod cache;
pub mod candle;
pub mod error;
pub mod mock;
pub mod model;

pub use crate::candle::CandleEmbedder;
pub use adapter::{embed, embed_on_blocking_pool, IntoEmbeddingVector};
pub use cache::{ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use mock::StaticEmbedder;
pub use model::{EmbeddingModel, ModelInfo};
