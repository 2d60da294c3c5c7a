//! Document retrieval.

use rag_types::{RetrievedDocument, TopicRelation};
use rag_vector::VectorStore;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Search the store for `query`, and on `same_topic` also for the summary.
///
/// The summary results are appended after the primary ones as-is: no
/// deduplication, no re-ranking. The result can therefore hold up to
/// `2 * top_k` documents. Documents with a non-finite score are rejected.
pub async fn retrieve<V>(
    vector_db: &V,
    query: &str,
    summary: Option<&str>,
    relation: TopicRelation,
    top_k: usize,
) -> Result<Vec<RetrievedDocument>, PipelineError>
where
    V: VectorStore + ?Sized,
{
    let mut documents = vector_db.search(query, top_k).await?;
    debug!(count = documents.len(), "Primary search complete");

    if relation == TopicRelation::SameTopic {
        if let Some(summary) = summary.filter(|s| !s.is_empty()) {
            let context = vector_db.search(summary, top_k).await?;
            debug!(count = context.len(), "Summary search complete");
            documents.extend(context);
        }
    }

    if let Some(bad) = documents.iter().find(|d| !d.score.is_finite()) {
        return Err(PipelineError::Schema(format!(
            "retrieved document has non-finite score {}",
            bad.score
        )));
    }

    if documents.is_empty() {
        warn!("No documents retrieved");
    } else {
        info!(count = documents.len(), relation = %relation, "Documents retrieved");
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rag_vector::MockVectorStore;

    fn doc(content: &str, score: f32) -> RetrievedDocument {
        RetrievedDocument::new(content, score)
    }

    fn store() -> MockVectorStore {
        MockVectorStore::new()
            .with_results("query", vec![doc("a", 0.9), doc("shared", 0.8)])
            .with_results("summary", vec![doc("shared", 0.85), doc("c", 0.7)])
    }

    #[tokio::test]
    async fn test_same_topic_appends_summary_results() {
        let store = store();
        let docs = retrieve(&store, "query", Some("summary"), TopicRelation::SameTopic, 5)
            .await
            .unwrap();

        assert_eq!(
            docs,
            vec![
                doc("a", 0.9),
                doc("shared", 0.8),
                doc("shared", 0.85),
                doc("c", 0.7)
            ]
        );
        assert_eq!(
            store.calls(),
            vec![("query".to_string(), 5), ("summary".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn test_partial_and_new_topic_search_once() {
        for relation in [TopicRelation::Partial, TopicRelation::NewTopic] {
            let store = store();
            let docs = retrieve(&store, "query", Some("summary"), relation, 5)
                .await
                .unwrap();
            assert_eq!(docs.len(), 2);
            assert_eq!(store.queries(), vec!["query".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_same_topic_without_summary_searches_once() {
        for summary in [None, Some("")] {
            let store = store();
            retrieve(&store, "query", summary, TopicRelation::SameTopic, 5)
                .await
                .unwrap();
            assert_eq!(store.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_top_k_is_passed_through() {
        let store = store();
        let docs = retrieve(&store, "query", None, TopicRelation::NewTopic, 1)
            .await
            .unwrap();
        assert_eq!(docs, vec![doc("a", 0.9)]);
        assert_eq!(store.calls(), vec![("query".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_nan_score_is_schema_error() {
        let store = MockVectorStore::new().with_default_results(vec![doc("x", f32::NAN)]);
        let result = retrieve(&store, "query", None, TopicRelation::NewTopic, 5).await;
        assert!(matches!(result, Err(PipelineError::Schema(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MockVectorStore::new().failing();
        let result = retrieve(&store, "query", None, TopicRelation::NewTopic, 5).await;
        assert!(matches!(result, Err(PipelineError::Vector(_))));
    }
}
