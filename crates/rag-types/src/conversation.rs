//! Conversation state threaded between pipeline calls.
//!
//! The caller owns the state. The pipeline receives it by reference and hands
//! back a fresh value; it never keeps anything between calls.

use serde::{Deserialize, Serialize};

use crate::topic::TopicRelation;
use crate::vector::EmbeddingVector;

/// Long-term memory of one conversation.
///
/// All fields are absent on the first turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Running summary of the conversation
    #[serde(default)]
    pub summary: Option<String>,

    /// Embedding of `summary`
    #[serde(default)]
    pub summary_embedding: Option<EmbeddingVector>,

    /// Topic anchor, blended turn by turn
    #[serde(default)]
    pub topic_embedding: Option<EmbeddingVector>,
}

impl ConversationState {
    /// Create an empty (first turn) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary text if present and not empty.
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    /// First turn: no summary yet, or only whitespace.
    pub fn is_first_turn(&self) -> bool {
        self.summary
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    }
}

/// Terminal output of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Answer shown to the user
    pub answer: String,

    /// State to pass into the next call
    pub state: ConversationState,

    /// Topic relation used for this turn (after promotion)
    pub topic_relation: TopicRelation,

    /// Cosine similarity between the query and the prior topic anchor
    pub topic_similarity: f32,

    /// Set when the confidence gate withheld the answer
    #[serde(default)]
    pub low_confidence: bool,
}
