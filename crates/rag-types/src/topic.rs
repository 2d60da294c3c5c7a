//! Topic relation types.
//!
//! A query either continues the conversation's current subject, partially
//! overlaps it, or starts a new one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a new query relates to the conversation's topic anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicRelation {
    /// The query starts a new subject. The topic anchor resets to the query.
    NewTopic,
    /// The query continues the current subject.
    SameTopic,
    /// The query overlaps the current subject without clearly continuing it.
    Partial,
}

impl TopicRelation {
    /// Stable snake_case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicRelation::NewTopic => "new_topic",
            TopicRelation::SameTopic => "same_topic",
            TopicRelation::Partial => "partial",
        }
    }

    /// Short label shown to users in front of an answer.
    pub fn indicator(&self) -> &'static str {
        match self {
            TopicRelation::NewTopic => "New topic",
            TopicRelation::SameTopic => "Continuing on the same topic",
            TopicRelation::Partial => "Partially related topic",
        }
    }
}

impl fmt::Display for TopicRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing a query against the topic anchor.
///
/// Computed once per request and consumed by the rewriter, the retriever and
/// the memory updater of that same request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicAssessment {
    /// Classified relation
    pub relation: TopicRelation,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

impl TopicAssessment {
    pub fn new(relation: TopicRelation, similarity: f32) -> Self {
        Self {
            relation,
            similarity,
        }
    }

    /// Assessment used when there is no topic anchor to compare against.
    pub fn no_prior_topic() -> Self {
        Self::new(TopicRelation::NewTopic, 0.0)
    }

    /// Treat a strong `partial` as `same_topic`.
    ///
    /// Any other relation, and a `partial` below `threshold`, is returned
    /// unchanged. The similarity is never altered.
    pub fn promoted(self, threshold: f32) -> Self {
        match self.relation {
            TopicRelation::Partial if self.similarity >= threshold => {
                Self::new(TopicRelation::SameTopic, self.similarity)
            }
            _ => self,
        }
    }
}
