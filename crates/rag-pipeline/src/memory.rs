//! Long-term conversation memory.
//!
//! After an answered turn the running summary absorbs the exchange and is
//! re-embedded; the topic anchor moves by relation (see
//! [`rag_topics::update_topic_embedding`]).

use rag_llm::{LanguageModel, LlmError};
use tracing::{debug, info};

/// Prompt folding one exchange into the summary.
pub fn summary_prompt(previous_summary: &str, query: &str, answer: &str) -> String {
    format!(
        "Update the summary with the new interaction.\n\n\
         Existing Summary:\n{previous_summary}\n\n\
         User Question:\n{query}\n\n\
         Answer:\n{answer}"
    )
}

/// Fold `(query, answer)` into the summary. An absent summary counts as empty.
pub async fn update_summary<L>(
    llm: &L,
    previous_summary: Option<&str>,
    query: &str,
    answer: &str,
) -> Result<String, LlmError>
where
    L: LanguageModel + ?Sized,
{
    let previous_summary = previous_summary.unwrap_or_default();
    debug!(
        previous_len = previous_summary.len(),
        query_len = query.len(),
        answer_len = answer.len(),
        "Updating summary"
    );

    let prompt = summary_prompt(previous_summary, query, answer);
    let summary = llm.complete(&prompt).await?.trim().to_string();

    info!(summary_len = summary.len(), "Summary updated");
    Ok(summary)
}
