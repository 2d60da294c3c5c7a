//! Conversation sessions.
//!
//! The pipeline keeps no memory; a session owns one conversation's state
//! and threads it from turn to turn.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use rag_embeddings::EmbeddingModel;
use rag_llm::LanguageModel;
use rag_pipeline::{PipelineError, RagPipeline};
use rag_types::{ConversationState, PipelineResult};
use rag_vector::VectorStore;

/// One conversation.
pub struct ChatSession<L, E, V>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized,
    V: VectorStore + ?Sized,
{
    pipeline: RagPipeline<L, E, V>,
    state: ConversationState,
    turns: usize,
}

impl<L, E, V> ChatSession<L, E, V>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized + 'static,
    V: VectorStore + ?Sized,
{
    pub fn new(pipeline: RagPipeline<L, E, V>) -> Self {
        Self::with_state(pipeline, ConversationState::default())
    }

    /// Resume a conversation from saved state.
    pub fn with_state(pipeline: RagPipeline<L, E, V>, state: ConversationState) -> Self {
        Self {
            pipeline,
            state,
            turns: 0,
        }
    }

    /// Run one turn. The session state only advances on success.
    pub async fn send(&mut self, query: &str) -> Result<PipelineResult, PipelineError> {
        let result = self.pipeline.run(query, &self.state).await?;
        self.state = result.state.clone();
        self.turns += 1;
        debug!(turns = self.turns, "Session state advanced");
        Ok(result)
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Forget the conversation.
    pub fn reset(&mut self) {
        self.state = ConversationState::default();
        self.turns = 0;
    }
}

/// Answer prefixed with the topic indicator.
pub fn format_reply(result: &PipelineResult) -> String {
    format!("{}\n\n{}", result.topic_relation.indicator(), result.answer)
}

/// Read conversation state from `path`; a missing file is a fresh conversation.
pub fn load_state(path: &Path) -> Result<ConversationState> {
    if !path.exists() {
        return Ok(ConversationState::default());
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read state file {:?}", path))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid state file {:?}", path))
}

pub fn save_state(path: &Path, state: &ConversationState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state).context("Failed to serialize state")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write state file {:?}", path))
}
