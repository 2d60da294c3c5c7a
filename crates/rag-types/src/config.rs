//! Configuration loading for topic-rag.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/topic-rag/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Cosine similarity above which a query continues the current topic.
pub const SAME_TOPIC_THRESHOLD: f32 = 0.8;

/// Cosine similarity at or above which a query partially overlaps the topic.
pub const PARTIAL_TOPIC_THRESHOLD: f32 = 0.5;

/// A `partial` relation at or above this similarity is treated as `same_topic`.
pub const PROMOTION_THRESHOLD: f32 = 0.65;

/// Minimum best retrieval score required to answer on a follow-up turn.
pub const MIN_RETRIEVAL_SCORE: f32 = 0.75;

/// Passages requested per vector search.
pub const TOP_K: usize = 5;

/// Topic detection and topic-anchor blending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSettings {
    /// Similarity strictly above this is `same_topic`
    #[serde(default = "default_same_topic_threshold")]
    pub same_topic_threshold: f32,

    /// Similarity at or above this (and not above same) is `partial`
    #[serde(default = "default_partial_topic_threshold")]
    pub partial_topic_threshold: f32,

    /// `partial` at or above this similarity is promoted to `same_topic`
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: f32,

    /// Weight kept by the prior anchor on a `same_topic` turn
    #[serde(default = "default_same_topic_weight")]
    pub same_topic_weight: f32,

    /// Weight kept by the prior anchor on a `partial` turn
    #[serde(default = "default_partial_topic_weight")]
    pub partial_topic_weight: f32,
}

fn default_same_topic_threshold() -> f32 {
    SAME_TOPIC_THRESHOLD
}

fn default_partial_topic_threshold() -> f32 {
    PARTIAL_TOPIC_THRESHOLD
}

fn default_promotion_threshold() -> f32 {
    PROMOTION_THRESHOLD
}

fn default_same_topic_weight() -> f32 {
    0.7
}

fn default_partial_topic_weight() -> f32 {
    0.9
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            same_topic_threshold: default_same_topic_threshold(),
            partial_topic_threshold: default_partial_topic_threshold(),
            promotion_threshold: default_promotion_threshold(),
            same_topic_weight: default_same_topic_weight(),
            partial_topic_weight: default_partial_topic_weight(),
        }
    }
}

impl TopicSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("same_topic_threshold", self.same_topic_threshold),
            ("partial_topic_threshold", self.partial_topic_threshold),
            ("promotion_threshold", self.promotion_threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(format!("{} must be -1.0-1.0, got {}", name, value));
            }
        }
        if self.same_topic_threshold <= self.partial_topic_threshold {
            return Err(format!(
                "same_topic_threshold ({}) must be greater than partial_topic_threshold ({})",
                self.same_topic_threshold, self.partial_topic_threshold
            ));
        }
        for (name, value) in [
            ("same_topic_weight", self.same_topic_weight),
            ("partial_topic_weight", self.partial_topic_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be 0.0-1.0, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Retrieval breadth and the confidence cut point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Passages per search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Best score required to answer on a follow-up turn
    #[serde(default = "default_min_retrieval_score")]
    pub min_retrieval_score: f32,
}

fn default_top_k() -> usize {
    TOP_K
}

fn default_min_retrieval_score() -> f32 {
    MIN_RETRIEVAL_SCORE
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_retrieval_score: default_min_retrieval_score(),
        }
    }
}

impl RetrievalSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }
        Ok(())
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name ("openai" or "anthropic")
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini")
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (loaded from env var, not stored in config file)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per completion before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            api_base_url: None,
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Local embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// HuggingFace repository of the sentence-transformer model
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    /// Model cache directory (platform cache dir when unset)
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_model_repo() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            cache_dir: None,
        }
    }
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Trimmed chunks shorter than this are dropped
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Passages inserted per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_chunk_size() -> usize {
    400
}

fn default_chunk_overlap() -> usize {
    80
}

fn default_min_chunk_chars() -> usize {
    150
}

fn default_batch_size() -> usize {
    100
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            batch_size: default_batch_size(),
        }
    }
}

impl IngestSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the vector index and passage catalog
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Topic detection settings
    #[serde(default)]
    pub topics: TopicSettings,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// Language model settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Ingestion settings
    #[serde(default)]
    pub ingest: IngestSettings,
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "topic-rag")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            log_level: default_log_level(),
            topics: TopicSettings::default(),
            retrieval: RetrievalSettings::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            ingest: IngestSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/topic-rag/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (RAG_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "topic-rag")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_path", default_index_path())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("llm.provider", default_llm_provider())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("llm.model", default_llm_model())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: RAG_LOG_LEVEL, RAG_LLM__API_KEY, RAG_TOPICS__SAME_TOPIC_THRESHOLD, etc.
        builder = builder.add_source(
            Environment::with_prefix("RAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), TypesError> {
        self.topics.validate().map_err(TypesError::Config)?;
        self.retrieval.validate().map_err(TypesError::Config)?;
        self.ingest.validate().map_err(TypesError::Config)?;
        Ok(())
    }

    /// Expand ~ in index_path to the home directory
    pub fn expanded_index_path(&self) -> PathBuf {
        if let Some(rest) = self.index_path.strip_prefix("~/") {
            if let Some(base) = directories::BaseDirs::new() {
                return base.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.index_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.llm.provider, "openai");
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.retrieval.top_k, 5);
        assert!((settings.retrieval.min_retrieval_score - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_topic_defaults() {
        let topics = TopicSettings::default();
        assert!((topics.same_topic_threshold - 0.8).abs() < f32::EPSILON);
        assert!((topics.partial_topic_threshold - 0.5).abs() < f32::EPSILON);
        assert!((topics.promotion_threshold - 0.65).abs() < f32::EPSILON);
        assert!((topics.same_topic_weight - 0.7).abs() < f32::EPSILON);
        assert!((topics.partial_topic_weight - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.retrieval.top_k, 5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_topic_validation_rejects_misordered_thresholds() {
        let topics = TopicSettings {
            same_topic_threshold: 0.4,
            partial_topic_threshold: 0.5,
            ..Default::default()
        };
        assert!(topics.validate().is_err());
    }

    #[test]
    fn test_topic_validation_rejects_out_of_range_weight() {
        let topics = TopicSettings {
            partial_topic_weight: 1.5,
            ..Default::default()
        };
        assert!(topics.validate().is_err());
    }

    #[test]
    fn test_ingest_validation() {
        let mut ingest = IngestSettings::default();
        assert!(ingest.validate().is_ok());

        ingest.chunk_overlap = ingest.chunk_size;
        assert!(ingest.validate().is_err());
    }

    #[test]
    fn test_partial_settings_use_serde_defaults() {
        let json = r#"{"retrieval": {"top_k": 8}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.retrieval.top_k, 8);
        assert!((settings.retrieval.min_retrieval_score - 0.75).abs() < f32::EPSILON);
        assert!((settings.topics.same_topic_threshold - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_expanded_index_path_plain() {
        let settings = Settings {
            index_path: "/var/lib/topic-rag".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.expanded_index_path(),
            PathBuf::from("/var/lib/topic-rag")
        );
    }
}
