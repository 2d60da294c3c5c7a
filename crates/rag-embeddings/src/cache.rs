//! Local copy of a sentence-transformer repository.
//!
//! The first load fetches the three files the embedder needs from the
//! HuggingFace Hub; later loads read them from disk. Files already present
//! are never fetched again.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EmbeddingError;

/// all-MiniLM-L6-v2, the sentence encoder the pipeline is tuned for
pub const DEFAULT_MODEL_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Files an encoder repository must provide: config, tokenizer, weights.
pub const MODEL_FILES: &[&str] = &["config.json", "tokenizer.json", "model.safetensors"];

/// Where a model repository is mirrored on disk.
#[derive(Debug, Clone)]
pub struct ModelCache {
    /// Root directory shared by all cached repositories
    pub cache_dir: PathBuf,
    /// Hub repository, `owner/name`
    pub repo_id: String,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::for_repo(DEFAULT_MODEL_REPO)
    }
}

impl ModelCache {
    pub fn new(cache_dir: impl Into<PathBuf>, repo_id: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repo_id: repo_id.into(),
        }
    }

    /// `repo_id` under the platform cache directory.
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("topic-rag")
            .join("models");
        Self::new(cache_dir, repo_id)
    }

    /// Directory holding this repository's files (`owner_name`).
    pub fn model_dir(&self) -> PathBuf {
        self.cache_dir.join(self.repo_id.replace('/', "_"))
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.model_dir().join(filename)
    }

    /// Required files not on disk yet.
    pub fn missing_files(&self) -> Vec<&'static str> {
        MODEL_FILES
            .iter()
            .copied()
            .filter(|f| !self.file_path(f).exists())
            .collect()
    }

    pub fn is_cached(&self) -> bool {
        self.missing_files().is_empty()
    }

    /// Make sure every required file is on disk and return their paths.
    pub fn resolve(&self) -> Result<ModelPaths, EmbeddingError> {
        let missing = self.missing_files();
        if missing.is_empty() {
            debug!(dir = %self.model_dir().display(), "Model files cached");
        } else {
            info!(repo = %self.repo_id, files = missing.len(), "Fetching model files");
            self.fetch(&missing)?;
        }
        Ok(ModelPaths::in_dir(&self.model_dir()))
    }

    fn fetch(&self, files: &[&str]) -> Result<(), EmbeddingError> {
        use hf_hub::api::sync::Api;

        let api = Api::new().map_err(|e| EmbeddingError::Download(e.to_string()))?;
        let repo = api.model(self.repo_id.clone());
        std::fs::create_dir_all(self.model_dir())?;

        for &file in files {
            let fetched = repo
                .get(file)
                .map_err(|e| EmbeddingError::Download(format!("{}/{}: {}", self.repo_id, file, e)))?;
            let dest = self.file_path(file);
            std::fs::copy(&fetched, &dest)?;
            debug!(file, dest = %dest.display(), "Model file stored");
        }
        Ok(())
    }
}

/// On-disk locations of one encoder's files.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            config: dir.join(MODEL_FILES[0]),
            tokenizer: dir.join(MODEL_FILES[1]),
            weights: dir.join(MODEL_FILES[2]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_repo_under_topic_rag_cache() {
        let cache = ModelCache::default();
        assert!(cache.cache_dir.ends_with("topic-rag/models"));
        assert_eq!(cache.repo_id, DEFAULT_MODEL_REPO);
    }

    #[test]
    fn test_model_dir_flattens_repo_id() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "org/model");
        assert_eq!(cache.model_dir(), temp.path().join("org_model"));
    }

    #[test]
    fn test_missing_files_shrinks_as_files_appear() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        assert_eq!(cache.missing_files(), MODEL_FILES.to_vec());

        std::fs::create_dir_all(cache.model_dir()).unwrap();
        std::fs::write(cache.file_path("config.json"), b"{}").unwrap();
        std::fs::write(cache.file_path("tokenizer.json"), b"{}").unwrap();
        assert_eq!(cache.missing_files(), vec!["model.safetensors"]);
        assert!(!cache.is_cached());

        std::fs::write(cache.file_path("model.safetensors"), b"weights").unwrap();
        assert!(cache.is_cached());
    }

    #[test]
    fn test_resolve_skips_fetch_when_cached() {
        let temp = TempDir::new().unwrap();
        let cache = ModelCache::new(temp.path(), "test/model");
        std::fs::create_dir_all(cache.model_dir()).unwrap();
        for file in MODEL_FILES {
            std::fs::write(cache.file_path(file), b"x").unwrap();
        }

        let paths = cache.resolve().unwrap();
        assert_eq!(paths.weights, cache.file_path("model.safetensors"));
        assert_eq!(paths.tokenizer, cache.file_path("tokenizer.json"));
    }
}
