//! Query rewriting.
//!
//! Turns a follow-up question into a retrieval-ready query using the running
//! summary. New topics and turns without a summary skip the model entirely.

use rag_llm::{LanguageModel, LlmError};
use rag_types::TopicRelation;
use tracing::{debug, info};

/// Prompt for a query that continues the current topic.
pub fn same_topic_prompt(query: &str, summary: &str) -> String {
    format!(
        "Rewrite the user question using the context below.\n\n\
         Context:\n{summary}\n\n\
         Question:\n{query}"
    )
}

/// Prompt for a query that only partially overlaps the current topic.
pub fn partial_topic_prompt(query: &str, summary: &str) -> String {
    format!(
        "Rewrite the question as a standalone query.\n\
         Use the context only if clearly relevant.\n\n\
         Context:\n{summary}\n\n\
         Question:\n{query}"
    )
}

/// Rewrite `query` for retrieval.
///
/// Returns `query` unchanged, without a model call, when the relation is
/// `new_topic` or the summary is absent or empty. Otherwise returns the
/// trimmed completion. A model failure propagates; there is no fallback to
/// the original query.
pub async fn rewrite<L>(
    query: &str,
    summary: Option<&str>,
    relation: TopicRelation,
    llm: &L,
) -> Result<String, LlmError>
where
    L: LanguageModel + ?Sized,
{
    let summary = match summary {
        Some(summary) if !summary.is_empty() && relation != TopicRelation::NewTopic => summary,
        _ => {
            debug!(relation = %relation, "Skipping query rewrite (new topic or empty summary)");
            return Ok(query.to_string());
        }
    };

    let prompt = match relation {
        TopicRelation::SameTopic => same_topic_prompt(query, summary),
        _ => partial_topic_prompt(query, summary),
    };

    let rewritten = llm.complete(&prompt).await?.trim().to_string();
    info!(
        relation = %relation,
        original_len = query.len(),
        rewritten_len = rewritten.len(),
        "Query rewritten"
    );
    Ok(rewritten)
}
