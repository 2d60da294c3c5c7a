//! # rag-types
//!
//! Shared domain types for the topic-aware conversational RAG pipeline.
//!
//! This crate defines the values that flow between the pipeline stages:
//! - Embedding vectors produced by the embedder
//! - Topic relations and assessments from the topic detector
//! - Retrieved documents from the vector store
//! - Conversation state threaded by the caller between turns
//! - Settings: layered configuration for thresholds and collaborators
//!
//! ## Usage
//!
//! ```rust
//! use rag_types::{ConversationState, TopicRelation};
//!
//! let state = ConversationState::default();
//! assert!(state.is_first_turn());
//! assert_eq!(TopicRelation::SameTopic.as_str(), "same_topic");
//! ```

pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod topic;
pub mod vector;

pub use config::{
    EmbeddingSettings, IngestSettings, LlmSettings, RetrievalSettings, Settings, TopicSettings,
    MIN_RETRIEVAL_SCORE, PARTIAL_TOPIC_THRESHOLD, PROMOTION_THRESHOLD, SAME_TOPIC_THRESHOLD,
    TOP_K,
};
pub use conversation::{ConversationState, PipelineResult};
pub use document::RetrievedDocument;
pub use error::TypesError;
pub use topic::{TopicAssessment, TopicRelation};
pub use vector::EmbeddingVector;
