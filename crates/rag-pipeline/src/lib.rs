//! # rag-pipeline
//!
//! One request/response cycle of a topic-aware conversational RAG system.
//!
//! Per turn the pipeline embeds the query, classifies it against the
//! conversation's topic anchor, rewrites it for retrieval, searches the
//! vector store, gates on retrieval confidence, answers, and folds the turn
//! into the running summary and topic anchor.
//!
//! ## Core Concepts
//!
//! - **Topic relation**: `new_topic`, `same_topic` or `partial`, from cosine
//!   similarity against the anchor. A `partial` at or above the promotion
//!   threshold is treated as `same_topic` here, not in the detector.
//! - **First turn**: no summary yet (or only whitespace). A first turn is
//!   always answered, confident or not.
//! - **Confidence gate**: later turns whose best retrieval score is below
//!   the threshold get a fixed apology and leave memory untouched.
//! - **Conversation state**: owned by the caller, passed in by reference and
//!   returned fresh. Nothing is kept between calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rag_pipeline::{run_rag_pipeline, PipelineConfig};
//! use rag_types::ConversationState;
//!
//! let mut state = ConversationState::default();
//! for query in ["What is ownership?", "And borrowing?"] {
//!     let result =
//!         run_rag_pipeline(query, &llm, &embedder, &store, &state, &PipelineConfig::default())
//!             .await?;
//!     println!("[{}] {}", result.topic_relation.indicator(), result.answer);
//!     state = result.state;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`rewriter`]: relation-conditioned query rewriting
//! - [`retriever`]: primary search plus summary search on `same_topic`
//! - [`confidence`]: best-score admission check
//! - [`answer`]: grounded answer generation
//! - [`memory`]: running summary and topic anchor update
//! - [`orchestrator`]: the per-turn sequence

pub mod answer;
pub mod config;
pub mod confidence;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod retriever;
pub mod rewriter;

pub use answer::{generate, NO_ANSWER};
pub use config::PipelineConfig;
pub use confidence::{best_score, is_confident};
pub use error::PipelineError;
pub use memory::update_summary;
pub use orchestrator::{assess_topic, run_rag_pipeline, RagPipeline, LOW_CONFIDENCE_MESSAGE};
pub use retriever::retrieve;
pub use rewriter::rewrite;
