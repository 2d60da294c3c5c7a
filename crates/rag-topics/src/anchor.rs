//! Topic anchor update.
//!
//! After an answered turn the anchor moves toward the query by an amount that
//! depends on the relation: it resets on a new topic, drifts slowly on the
//! same topic and barely moves on a partial overlap.

use rag_types::{EmbeddingVector, TopicRelation, TopicSettings};
use tracing::debug;

use crate::error::TopicsError;

/// Element-wise `prior_weight * prior + (1 - prior_weight) * query`.
pub fn blend(
    prior: &[f32],
    query: &[f32],
    prior_weight: f32,
) -> Result<Vec<f32>, TopicsError> {
    if prior.len() != query.len() {
        return Err(TopicsError::DimensionMismatch {
            expected: prior.len(),
            actual: query.len(),
        });
    }

    let query_weight = 1.0 - prior_weight;
    Ok(prior
        .iter()
        .zip(query.iter())
        .map(|(p, q)| prior_weight * p + query_weight * q)
        .collect())
}

/// Compute the next topic anchor.
///
/// - `new_topic`, or no prior anchor: the query embedding itself
/// - `same_topic`: blend keeping `same_topic_weight` of the prior (0.7)
/// - `partial`: blend keeping `partial_topic_weight` of the prior (0.9)
pub fn update_topic_embedding(
    relation: TopicRelation,
    prior: Option<&EmbeddingVector>,
    query: &EmbeddingVector,
    settings: &TopicSettings,
) -> Result<EmbeddingVector, TopicsError> {
    let (prior, prior_weight) = match (relation, prior) {
        (TopicRelation::SameTopic, Some(prior)) => (prior, settings.same_topic_weight),
        (TopicRelation::Partial, Some(prior)) => (prior, settings.partial_topic_weight),
        (TopicRelation::NewTopic, _) | (_, None) => {
            debug!(relation = %relation, "Topic anchor reset to query");
            return Ok(query.clone());
        }
    };

    debug!(relation = %relation, prior_weight, "Blending topic anchor");
    blend(prior.as_slice(), query.as_slice(), prior_weight).map(EmbeddingVector::new)
}
