//! # rag-llm
//!
//! Text-in/text-out completion for the RAG pipeline.
//!
//! Every call is single-turn: the prompt carries all the context, nothing is
//! remembered between calls. Retry with exponential backoff lives in the HTTP
//! adapter, never in the pipeline.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rag_llm::{ApiLanguageModel, ApiLlmConfig, LanguageModel};
//!
//! # async fn example() -> Result<(), rag_llm::LlmError> {
//! let llm = ApiLanguageModel::new(ApiLlmConfig::openai("sk-test", "gpt-4o-mini"))?;
//! let text = llm.complete("Say hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod mock;

pub use api::{ApiLanguageModel, ApiLlmConfig, Provider};
pub use error::LlmError;
pub use mock::MockLanguageModel;

use async_trait::async_trait;

/// Single-turn completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, returning the model's text with surrounding
    /// whitespace removed.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}
