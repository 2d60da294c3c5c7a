//! topic-rag
//!
//! Conversational question answering over a local document index, with
//! topic tracking, confidence gating and a running conversation summary.
//!
//! # Usage
//!
//! ```bash
//! topic-rag ingest ./data
//! topic-rag chat
//! topic-rag ask "What is self-attention?" --state conversation.json
//! topic-rag status
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/topic-rag/config.toml)
//! 3. Environment variables (RAG_*, e.g. RAG_LLM__API_KEY)
//! 4. CLI flags

use std::path::Path;

use anyhow::Result;
use clap::Parser;

use rag_cli::{
    init_tracing, load_settings, run_ask, run_chat, run_ingest, show_status, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.index_path.as_deref(),
    )?;
    init_tracing(&settings.log_level)?;

    match cli.command {
        Commands::Chat => {
            run_chat(&settings).await?;
        }
        Commands::Ask { query, state, json } => {
            run_ask(&settings, &query, state.as_deref().map(Path::new), json).await?;
        }
        Commands::Ingest { dir } => {
            run_ingest(&settings, &dir)?;
        }
        Commands::Status => {
            show_status(&settings)?;
        }
    }

    Ok(())
}
