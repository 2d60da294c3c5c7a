//! Per-turn orchestration.
//!
//! A straight line with one early return:
//!
//! 1. embed the query
//! 2. assess the topic relation, promoting a strong `partial`
//! 3. rewrite the query
//! 4. retrieve documents
//! 5. gate on confidence (later turns only); on failure return the
//!    incoming state untouched
//! 6. answer
//! 7. update the summary, the topic anchor and the summary embedding

use std::sync::Arc;

use rag_embeddings::{embed_on_blocking_pool, EmbeddingModel};
use rag_llm::LanguageModel;
use rag_topics::{update_topic_embedding, TopicDetector};
use rag_types::{
    ConversationState, EmbeddingVector, PipelineResult, TopicAssessment, TopicSettings,
};
use rag_vector::VectorStore;
use tracing::{debug, error, info, warn};

use crate::answer::generate;
use crate::config::PipelineConfig;
use crate::confidence::{best_score, is_confident};
use crate::error::PipelineError;
use crate::memory::update_summary;
use crate::retriever::retrieve;
use crate::rewriter::rewrite;

/// Answer for a follow-up turn whose retrieval is too weak.
pub const LOW_CONFIDENCE_MESSAGE: &str =
    "I don\u{2019}t have enough relevant information to answer this confidently.";

/// Relation of `query` to the topic anchor, as the rest of the turn uses it.
///
/// No anchor yields `(new_topic, 0.0)` without comparing anything. Otherwise
/// the detector's pure classification applies, and a `partial` at or above
/// `promotion_threshold` becomes `same_topic`.
pub fn assess_topic(
    query: &EmbeddingVector,
    topic: Option<&EmbeddingVector>,
    settings: &TopicSettings,
) -> Result<TopicAssessment, PipelineError> {
    let Some(topic) = topic else {
        debug!("No topic anchor, treating as new topic");
        return Ok(TopicAssessment::no_prior_topic());
    };

    let detected = TopicDetector::from_settings(settings).detect(query, topic)?;
    let assessment = detected.promoted(settings.promotion_threshold);
    if assessment.relation != detected.relation {
        debug!(
            similarity = detected.similarity,
            threshold = settings.promotion_threshold,
            "Promoted partial to same_topic"
        );
    }
    Ok(assessment)
}

/// Run one conversational turn.
///
/// `state` is read, never modified; the returned result carries the next
/// state. On error the caller should keep its current state.
pub async fn run_rag_pipeline<L, E, V>(
    query: &str,
    llm: &L,
    embedder: &Arc<E>,
    vector_db: &V,
    state: &ConversationState,
    config: &PipelineConfig,
) -> Result<PipelineResult, PipelineError>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized + 'static,
    V: VectorStore + ?Sized,
{
    info!(query_len = query.len(), "Pipeline started");

    let result = run_turn(query, llm, embedder, vector_db, state, config).await;
    match &result {
        Ok(result) => info!(
            relation = %result.topic_relation,
            similarity = result.topic_similarity,
            low_confidence = result.low_confidence,
            answer_len = result.answer.len(),
            "Pipeline finished"
        ),
        Err(e) => error!(error = %e, "Pipeline failed"),
    }
    result
}

async fn run_turn<L, E, V>(
    query: &str,
    llm: &L,
    embedder: &Arc<E>,
    vector_db: &V,
    state: &ConversationState,
    config: &PipelineConfig,
) -> Result<PipelineResult, PipelineError>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized + 'static,
    V: VectorStore + ?Sized,
{
    let query_embedding = embed_on_blocking_pool(Arc::clone(embedder), query).await?;

    let topic = assess_topic(
        &query_embedding,
        state.topic_embedding.as_ref(),
        &config.topics,
    )?;
    info!(
        relation = %topic.relation,
        similarity = topic.similarity,
        "Topic relation"
    );

    let summary = state.summary_text();
    let rewritten = rewrite(query, summary, topic.relation, llm).await?;

    let docs = retrieve(
        vector_db,
        &rewritten,
        summary,
        topic.relation,
        config.retrieval.top_k,
    )
    .await?;

    let is_first_turn = state.is_first_turn();
    let confident = is_confident(&docs, config.retrieval.min_retrieval_score);
    debug!(
        best_score = best_score(&docs),
        threshold = config.retrieval.min_retrieval_score,
        confident,
        is_first_turn,
        "Confidence check"
    );

    if !confident && !is_first_turn {
        warn!(
            best_score = best_score(&docs),
            "Low retrieval confidence, memory left unchanged"
        );
        return Ok(PipelineResult {
            answer: LOW_CONFIDENCE_MESSAGE.to_string(),
            state: state.clone(),
            topic_relation: topic.relation,
            topic_similarity: topic.similarity,
            low_confidence: true,
        });
    }

    let answer = generate(llm, query, &docs, is_first_turn).await?;

    let summary = update_summary(llm, state.summary.as_deref(), query, &answer).await?;

    let topic_embedding = update_topic_embedding(
        topic.relation,
        state.topic_embedding.as_ref(),
        &query_embedding,
        &config.topics,
    )?;

    let summary_embedding = embed_on_blocking_pool(Arc::clone(embedder), &summary).await?;

    Ok(PipelineResult {
        answer,
        state: ConversationState {
            summary: Some(summary),
            summary_embedding: Some(summary_embedding),
            topic_embedding: Some(topic_embedding),
        },
        topic_relation: topic.relation,
        topic_similarity: topic.similarity,
        low_confidence: false,
    })
}

/// The three collaborators and the policy, bundled for repeated turns.
pub struct RagPipeline<L, E, V>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized,
    V: VectorStore + ?Sized,
{
    llm: Arc<L>,
    embedder: Arc<E>,
    vector_db: Arc<V>,
    config: PipelineConfig,
}

impl<L, E, V> RagPipeline<L, E, V>
where
    L: LanguageModel + ?Sized,
    E: EmbeddingModel + ?Sized + 'static,
    V: VectorStore + ?Sized,
{
    pub fn new(llm: Arc<L>, embedder: Arc<E>, vector_db: Arc<V>) -> Self {
        Self {
            llm,
            embedder,
            vector_db,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one turn. See [`run_rag_pipeline`].
    pub async fn run(
        &self,
        query: &str,
        state: &ConversationState,
    ) -> Result<PipelineResult, PipelineError> {
        run_rag_pipeline(
            query,
            self.llm.as_ref(),
            &self.embedder,
            self.vector_db.as_ref(),
            state,
            &self.config,
        )
        .await
    }
}
