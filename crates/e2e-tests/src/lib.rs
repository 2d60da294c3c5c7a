//! End-to-end test infrastructure for topic-rag.
//!
//! Provides a shared TestHarness that builds a real on-disk semantic store
//! (usearch index + RocksDB catalog) over a small document corpus, and a
//! keyword embedder so topic relations are predictable without a model.

use std::path::PathBuf;
use std::sync::Arc;

use rag_embeddings::{EmbeddingError, EmbeddingModel, ModelInfo};
use rag_types::{EmbeddingVector, IngestSettings};
use rag_vector::{IngestStats, SemanticStore};

/// Keyword groups, one embedding axis each.
pub const TOPICS: &[&[&str]] = &[
    &["rust", "ownership", "owner", "borrow", "lifetime"],
    &["garden", "soil", "compost", "plant", "seed"],
    &["sql", "join", "table", "query plan", "index scan"],
];

/// Constant first component so no text embeds to the zero vector.
const BIAS: f32 = 0.1;

pub const RUST_PASSAGE: &str = "Rust ownership: every value has a single owner, and the value is \
dropped when the owner goes out of scope. The borrow checker lets code borrow a value through \
references, shared or mutable, as long as each borrow stays within its lifetime.";

pub const GARDEN_PASSAGE: &str = "Preparing garden soil: loosen the soil to a spade's depth, mix \
in two inches of compost, and water it a week before you plant. Seed beds need fine, crumbly \
soil so that each seed makes good contact with the garden bed.";

/// Embeds text as `[BIAS, hits(topic 0), hits(topic 1), ...]`.
///
/// A hit is one occurrence of a keyword in the lowercased text.
pub struct KeywordEmbedder {
    info: ModelInfo,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            info: ModelInfo {
                name: "keyword".to_string(),
                dimension: TOPICS.len() + 1,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for KeywordEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let text = text.to_lowercase();
        let mut values = Vec::with_capacity(self.info.dimension);
        values.push(BIAS);
        for keywords in TOPICS {
            let hits: usize = keywords.iter().map(|k| text.matches(k).count()).sum();
            values.push(hits as f32);
        }
        Ok(EmbeddingVector::new(values))
    }
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Source documents
    pub docs_path: PathBuf,
    /// Semantic store directory
    pub index_path: PathBuf,
    pub embedder: Arc<KeywordEmbedder>,
    pub store: Arc<SemanticStore<KeywordEmbedder>>,
}

impl TestHarness {
    /// Empty store, no documents.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let docs_path = temp_dir.path().join("docs");
        let index_path = temp_dir.path().join("index");
        std::fs::create_dir_all(&docs_path).expect("Failed to create docs dir");

        let embedder = Arc::new(KeywordEmbedder::new());
        let store = Arc::new(
            SemanticStore::open(&index_path, embedder.clone()).expect("Failed to open store"),
        );

        Self {
            _temp_dir: temp_dir,
            docs_path,
            index_path,
            embedder,
            store,
        }
    }

    /// Store holding the Rust and gardening passages.
    pub fn with_corpus() -> Self {
        let harness = Self::new();
        harness.write_doc("rust.txt", RUST_PASSAGE);
        harness.write_doc("garden.md", GARDEN_PASSAGE);
        let stats = harness.ingest();
        assert_eq!(stats.passages_added, 2, "corpus passages must fit one chunk each");
        harness
    }

    pub fn write_doc(&self, name: &str, text: &str) {
        std::fs::write(self.docs_path.join(name), text).expect("Failed to write doc");
    }

    /// Ingest `docs_path` with default settings.
    pub fn ingest(&self) -> IngestStats {
        self.store
            .ingest_dir(&self.docs_path, &IngestSettings::default())
            .expect("Failed to ingest docs")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_embedder_axes() {
        let embedder = KeywordEmbedder::new();
        let v = embedder.embed("Rust ownership and the borrow checker").unwrap();
        assert_eq!(v.as_slice(), &[BIAS, 4.0, 0.0, 0.0]);

        let v = embedder.embed("nothing relevant").unwrap();
        assert_eq!(v.as_slice(), &[BIAS, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_corpus_passages_are_single_chunks() {
        for passage in [RUST_PASSAGE, GARDEN_PASSAGE] {
            let len = passage.chars().count();
            assert!((150..=400).contains(&len), "passage length {}", len);
        }
    }
}
