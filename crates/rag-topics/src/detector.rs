//! Topic relation detection.
//!
//! Classifies a query embedding against the topic anchor using two cosine
//! similarity cut points. The detector is a pure function of those two
//! thresholds; any policy layered on top (such as promoting a strong
//! `partial`) belongs to the caller.

use rag_types::{
    EmbeddingVector, TopicAssessment, TopicRelation, TopicSettings, PARTIAL_TOPIC_THRESHOLD,
    SAME_TOPIC_THRESHOLD,
};
use tracing::{debug, info};

use crate::error::TopicsError;
use crate::similarity::cosine_similarity;

/// Map a similarity to a relation.
///
/// - `similarity > same_threshold` → `same_topic`
/// - `partial_threshold <= similarity <= same_threshold` → `partial`
/// - otherwise → `new_topic`
pub fn classify(similarity: f32, same_threshold: f32, partial_threshold: f32) -> TopicRelation {
    if similarity > same_threshold {
        TopicRelation::SameTopic
    } else if similarity >= partial_threshold {
        TopicRelation::Partial
    } else {
        TopicRelation::NewTopic
    }
}

/// Compares queries against the topic anchor.
#[derive(Debug, Clone, Copy)]
pub struct TopicDetector {
    same_threshold: f32,
    partial_threshold: f32,
}

impl Default for TopicDetector {
    fn default() -> Self {
        Self::new(SAME_TOPIC_THRESHOLD, PARTIAL_TOPIC_THRESHOLD)
    }
}

impl TopicDetector {
    /// `same_threshold` is expected to be greater than `partial_threshold`;
    /// this is not checked here.
    pub fn new(same_threshold: f32, partial_threshold: f32) -> Self {
        Self {
            same_threshold,
            partial_threshold,
        }
    }

    pub fn from_settings(settings: &TopicSettings) -> Self {
        Self::new(
            settings.same_topic_threshold,
            settings.partial_topic_threshold,
        )
    }

    pub fn same_threshold(&self) -> f32 {
        self.same_threshold
    }

    pub fn partial_threshold(&self) -> f32 {
        self.partial_threshold
    }

    /// Classify `query` against `topic`.
    pub fn detect(
        &self,
        query: &EmbeddingVector,
        topic: &EmbeddingVector,
    ) -> Result<TopicAssessment, TopicsError> {
        let similarity = cosine_similarity(query.as_slice(), topic.as_slice())?;
        debug!(similarity, "Cosine similarity computed");

        let relation = classify(similarity, self.same_threshold, self.partial_threshold);

        info!(
            relation = %relation,
            similarity,
            same_threshold = self.same_threshold,
            partial_threshold = self.partial_threshold,
            "Topic relation determined"
        );

        Ok(TopicAssessment::new(relation, similarity))
    }
}
