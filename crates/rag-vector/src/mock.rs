//! Scripted vector store for testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use rag_types::RetrievedDocument;

use crate::error::VectorError;
use crate::store::VectorStore;

/// Vector store returning canned results per query text.
///
/// Queries without an entry get the default results (empty unless set).
/// Results are truncated to `top_k`. Every call is recorded.
#[derive(Default)]
pub struct MockVectorStore {
    results: HashMap<String, Vec<RetrievedDocument>>,
    default_results: Vec<RetrievedDocument>,
    fail: bool,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results for an exact query text.
    pub fn with_results(mut self, query: impl Into<String>, docs: Vec<RetrievedDocument>) -> Self {
        self.results.insert(query.into(), docs);
        self
    }

    /// Results for any other query.
    pub fn with_default_results(mut self, docs: Vec<RetrievedDocument>) -> Self {
        self.default_results = docs;
        self
    }

    /// Make every search fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// `(query, top_k)` of every search so far.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Query texts searched so far.
    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|(query, _)| query).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, VectorError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((query.to_string(), top_k));

        if self.fail {
            return Err(VectorError::Unavailable("mock vector store failure".to_string()));
        }

        let docs = self.results.get(query).unwrap_or(&self.default_results);
        Ok(docs.iter().take(top_k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, score: f32) -> RetrievedDocument {
        RetrievedDocument::new(content, score)
    }

    #[tokio::test]
    async fn test_per_query_results_and_truncation() {
        let store = MockVectorStore::new()
            .with_results("rust", vec![doc("a", 0.9), doc("b", 0.8), doc("c", 0.7)])
            .with_default_results(vec![doc("z", 0.1)]);

        let docs = store.search("rust", 2).await.unwrap();
        assert_eq!(docs, vec![doc("a", 0.9), doc("b", 0.8)]);

        let docs = store.search("other", 5).await.unwrap();
        assert_eq!(docs, vec![doc("z", 0.1)]);

        assert_eq!(
            store.calls(),
            vec![("rust".to_string(), 2), ("other".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn test_failing_store_records_call() {
        let store = MockVectorStore::new().failing();
        assert!(matches!(
            store.search("q", 5).await,
            Err(VectorError::Unavailable(_))
        ));
        assert_eq!(store.call_count(), 1);
    }
}
