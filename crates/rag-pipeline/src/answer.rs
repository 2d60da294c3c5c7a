//! Grounded answer generation.

use rag_llm::{LanguageModel, LlmError};
use rag_types::RetrievedDocument;
use tracing::{debug, info};

/// Returned when there is nothing to ground an answer on.
pub const NO_ANSWER: &str = "I don't know";

/// Document contents in retrieval order, separated by blank lines.
pub fn build_context(docs: &[RetrievedDocument]) -> String {
    docs.iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First-turn prompt: answer from context, best effort on partial context.
pub fn first_turn_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful AI assistant.\n\n\
         Use the context below to answer the question.\n\
         If the context is partial, still give a concise, correct explanation.\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}"
    )
}

/// Follow-up prompt: answer only from context, or say "I don't know".
pub fn grounded_prompt(query: &str, context: &str) -> String {
    format!(
        "Answer the question using ONLY the context below.\n\n\
         Rules:\n\
         - Do not use prior conversation.\n\
         - If the answer is not present, say \"{NO_ANSWER}\".\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}"
    )
}

/// Answer `query` from `docs`.
///
/// With no documents, returns [`NO_ANSWER`] without calling the model.
pub async fn generate<L>(
    llm: &L,
    query: &str,
    docs: &[RetrievedDocument],
    is_first_turn: bool,
) -> Result<String, LlmError>
where
    L: LanguageModel + ?Sized,
{
    if docs.is_empty() {
        info!("No documents, answering \"{}\"", NO_ANSWER);
        return Ok(NO_ANSWER.to_string());
    }

    let context = build_context(docs);
    debug!(docs = docs.len(), context_len = context.len(), is_first_turn, "Built answer context");

    let prompt = if is_first_turn {
        first_turn_prompt(query, &context)
    } else {
        grounded_prompt(query, &context)
    };

    let answer = llm.complete(&prompt).await?.trim().to_string();
    info!(answer_len = answer.len(), "Answer generated");
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_llm::MockLanguageModel;

    fn doc(content: &str) -> RetrievedDocument {
        RetrievedDocument::new(content, 0.9)
    }

    #[tokio::test]
    async fn test_no_documents_makes_no_call() {
        let llm = MockLanguageModel::new().with_default("should not be used");
        let answer = generate(&llm, "q", &[], false).await.unwrap();
        assert_eq!(answer, "I don't know");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_first_turn_prompt() {
        let llm = MockLanguageModel::new().with_response(" Ownership moves values. ");
        let answer = generate(&llm, "What is ownership?", &[doc("one"), doc("two")], true)
            .await
            .unwrap();

        assert_eq!(answer, "Ownership moves values.");
        let prompt = &llm.prompts()[0];
        assert!(prompt.starts_with("You are a helpful AI assistant."));
        assert!(prompt.contains("If the context is partial"));
        assert!(prompt.contains("Context:\none\n\ntwo\n\nQuestion:\nWhat is ownership?"));
    }

    #[tokio::test]
    async fn test_follow_up_prompt_is_strict() {
        let llm = MockLanguageModel::new().with_response("answer");
        generate(&llm, "q", &[doc("ctx")], false).await.unwrap();

        let prompt = &llm.prompts()[0];
        assert!(prompt.starts_with("Answer the question using ONLY the context below."));
        assert!(prompt.contains("- Do not use prior conversation."));
        assert!(prompt.contains("say \"I don't know\""));
    }

    #[test]
    fn test_context_keeps_order_and_duplicates() {
        let context = build_context(&[doc("b"), doc("a"), doc("b")]);
        assert_eq!(context, "b\n\na\n\nb");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let llm = MockLanguageModel::new().failing();
        assert!(generate(&llm, "q", &[doc("ctx")], true).await.is_err());
    }
}
