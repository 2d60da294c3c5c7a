//! Command implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use rag_embeddings::{CandleEmbedder, ModelCache};
use rag_llm::{ApiLanguageModel, ApiLlmConfig, Provider};
use rag_pipeline::{PipelineConfig, RagPipeline};
use rag_types::Settings;
use rag_vector::SemanticStore;

use crate::session::{format_reply, load_state, save_state, ChatSession};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    index_path_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(level) = log_level_override {
        settings.log_level = level.to_string();
    }
    if let Some(path) = index_path_override {
        settings.index_path = path.to_string();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn build_embedder(settings: &Settings) -> Result<Arc<CandleEmbedder>> {
    let repo = settings.embedding.model_repo.clone();
    let cache = match &settings.embedding.cache_dir {
        Some(dir) => ModelCache::new(dir, repo),
        None => ModelCache::for_repo(repo),
    };

    info!(repo = %cache.repo_id, "Loading embedding model");
    let embedder = CandleEmbedder::load(&cache).context("Failed to load embedding model")?;
    Ok(Arc::new(embedder))
}

/// Provider-specific environment variable consulted when no key is configured.
fn fallback_key_var(provider: &str) -> &'static str {
    match provider.parse::<Provider>() {
        Ok(Provider::Anthropic) => "ANTHROPIC_API_KEY",
        _ => "OPENAI_API_KEY",
    }
}

fn build_llm(settings: &Settings) -> Result<Arc<ApiLanguageModel>> {
    let mut llm_settings = settings.llm.clone();
    if llm_settings.api_key.is_none() {
        llm_settings.api_key = std::env::var(fallback_key_var(&llm_settings.provider)).ok();
    }

    let config = ApiLlmConfig::from_settings(&llm_settings).with_context(|| {
        format!(
            "Language model not configured (set RAG_LLM__API_KEY or {})",
            fallback_key_var(&llm_settings.provider)
        )
    })?;
    info!(provider = %llm_settings.provider, model = %config.model, "Language model ready");
    Ok(Arc::new(ApiLanguageModel::new(config)?))
}

fn open_store(
    settings: &Settings,
    embedder: Arc<CandleEmbedder>,
) -> Result<Arc<SemanticStore<CandleEmbedder>>> {
    let path = settings.expanded_index_path();
    let store = SemanticStore::open(&path, embedder)
        .with_context(|| format!("Failed to open index at {:?}", path))?;
    Ok(Arc::new(store))
}

type CliPipeline = RagPipeline<ApiLanguageModel, CandleEmbedder, SemanticStore<CandleEmbedder>>;

fn build_pipeline(settings: &Settings) -> Result<CliPipeline> {
    let embedder = build_embedder(settings)?;
    let store = open_store(settings, embedder.clone())?;
    let llm = build_llm(settings)?;

    Ok(RagPipeline::new(llm, embedder, store).with_config(PipelineConfig::from_settings(settings)))
}

/// Interactive chat loop.
///
/// `/reset` starts a new conversation, `/quit` or end of input leaves.
pub async fn run_chat(settings: &Settings) -> Result<()> {
    let mut session = ChatSession::new(build_pipeline(settings)?);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"topic-rag chat. /reset to start over, /quit to leave.\n")
        .await?;

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        match query {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                stdout.write_all(b"Conversation cleared.\n").await?;
                continue;
            }
            _ => {}
        }

        match session.send(query).await {
            Ok(result) => {
                stdout
                    .write_all(format!("\n{}\n", format_reply(&result)).as_bytes())
                    .await?;
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                stdout
                    .write_all(format!("\nError: {}\n", e).as_bytes())
                    .await?;
            }
        }
    }

    info!(turns = session.turns(), "Chat ended");
    Ok(())
}

/// Answer one question, optionally resuming and saving conversation state.
pub async fn run_ask(
    settings: &Settings,
    query: &str,
    state_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let state = match state_path {
        Some(path) => load_state(path)?,
        None => Default::default(),
    };

    let mut session = ChatSession::with_state(build_pipeline(settings)?, state);
    let result = session.send(query).await.context("Pipeline failed")?;

    if let Some(path) = state_path {
        save_state(path, session.state())?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_reply(&result));
    }
    Ok(())
}

/// Ingest a document directory into the index.
pub fn run_ingest(settings: &Settings, dir: &str) -> Result<()> {
    let embedder = build_embedder(settings)?;
    let store = open_store(settings, embedder)?;

    let stats = store
        .ingest_dir(dir, &settings.ingest)
        .with_context(|| format!("Failed to ingest {}", dir))?;

    println!("Ingested {}", dir);
    println!("  Files read:      {}", stats.files_read);
    println!("  Files skipped:   {}", stats.files_skipped);
    println!("  Chunks:          {}", stats.chunks_total);
    println!("  Chunks dropped:  {}", stats.chunks_dropped);
    println!("  Passages added:  {}", stats.passages_added);
    Ok(())
}

/// Print index statistics.
pub fn show_status(settings: &Settings) -> Result<()> {
    let path = settings.expanded_index_path();
    println!("Index path: {:?}", path);

    if !path.exists() {
        println!("Index not created yet. Run `topic-rag ingest <dir>` first.");
        return Ok(());
    }

    let embedder = build_embedder(settings)?;
    let store = open_store(settings, embedder)?;
    let stats = store.stats()?;

    println!("Model:      {}", stats.model);
    println!("Dimension:  {}", stats.dimension);
    println!("Vectors:    {}", stats.vector_count);
    println!("Passages:   {}", stats.passage_count);
    println!("Index size: {} bytes", stats.index_size_bytes);
    Ok(())
}
