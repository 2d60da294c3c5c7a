//! Scripted language model for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::LanguageModel;

/// Language model that replays scripted completions.
///
/// A reply is chosen in this order: the first rule whose needle occurs in the
/// prompt, then the next queued response, then the default. Every prompt is
/// recorded, including those of failing calls. Replies come back verbatim.
#[derive(Default)]
pub struct MockLanguageModel {
    rules: Vec<(String, String)>,
    queue: Mutex<VecDeque<String>>,
    default_response: Option<String>,
    fail_on_call: Option<usize>,
    prompts: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response to the queue.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.lock_queue().push_back(response.into());
        self
    }

    /// Reply with `response` whenever the prompt contains `needle`.
    pub fn with_rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Response used once rules and queue have nothing to offer.
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Fail every call.
    pub fn failing(self) -> Self {
        self.failing_on_call(1)
    }

    /// Fail the `n`th call (1-based) and every call after it.
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n.max(1));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let call = {
            let mut prompts = self
                .prompts
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if self.fail_on_call.is_some_and(|n| call >= n) {
            return Err(LlmError::Api("mock language model failure".to_string()));
        }

        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle)) {
            return Ok(reply.clone());
        }

        self.lock_queue()
            .pop_front()
            .or_else(|| self.default_response.clone())
            .ok_or(LlmError::EmptyResponse)
    }
}
