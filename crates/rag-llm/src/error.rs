//! Error types for language model calls.

use thiserror::Error;

/// Errors from a language model adapter.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

impl LlmError {
    /// Transport failures, 429 and 5xx may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Api(_) | LlmError::RateLimitExceeded => true,
            LlmError::Http { status, .. } => *status >= 500,
            LlmError::Parse(_) | LlmError::Config(_) | LlmError::EmptyResponse => false,
        }
    }
}
