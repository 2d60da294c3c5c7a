//! # rag-topics
//!
//! Tracks the subject of a conversation with a single embedding, the topic
//! anchor.
//!
//! ## Features
//! - Cosine similarity that rejects degenerate input instead of coercing it
//! - Pure three-way classification of a query against the anchor
//!   (`same_topic` / `partial` / `new_topic`) from two thresholds
//! - Relation-dependent exponential blending of the anchor after each turn

pub mod anchor;
pub mod detector;
pub mod error;
pub mod similarity;

pub use anchor::{blend, update_topic_embedding};
pub use detector::{classify, TopicDetector};
pub use error::TopicsError;
pub use similarity::cosine_similarity;
