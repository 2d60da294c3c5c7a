//! Pipeline configuration.

use rag_types::{RetrievalSettings, Settings, TopicSettings};

/// Numeric policy of the pipeline.
///
/// Not validated here; misordered thresholds are the caller's problem.
/// [`Settings::validate`] checks them at load time.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub topics: TopicSettings,
    pub retrieval: RetrievalSettings,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            topics: settings.topics.clone(),
            retrieval: settings.retrieval.clone(),
        }
    }
}
