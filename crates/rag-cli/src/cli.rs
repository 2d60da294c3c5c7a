//! CLI argument parsing for topic-rag.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// Topic-aware conversational RAG
///
/// Answers questions from an indexed document collection, tracking the
/// conversation's topic between turns.
#[derive(Parser, Debug)]
#[command(name = "topic-rag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/topic-rag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the index directory
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat; conversation memory lasts for the session
    Chat,

    /// Answer a single question
    Ask {
        /// The question
        query: String,

        /// JSON file holding the conversation state; read if present and
        /// rewritten after the turn
        #[arg(short, long)]
        state: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chunk, embed and index the .txt and .md files under a directory
    Ingest {
        /// Directory to ingest
        dir: String,
    },

    /// Show index statistics
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_chat() {
        let cli = Cli::parse_from(["topic-rag", "chat"]);
        assert!(matches!(cli.command, Commands::Chat));
    }

    #[test]
    fn test_cli_ask_with_state() {
        let cli = Cli::parse_from([
            "topic-rag",
            "ask",
            "What is ownership?",
            "--state",
            "/tmp/state.json",
        ]);
        match cli.command {
            Commands::Ask { query, state, json } => {
                assert_eq!(query, "What is ownership?");
                assert_eq!(state, Some("/tmp/state.json".to_string()));
                assert!(!json);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_ask_json() {
        let cli = Cli::parse_from(["topic-rag", "ask", "q", "--json"]);
        assert!(matches!(cli.command, Commands::Ask { json: true, .. }));
    }

    #[test]
    fn test_cli_ingest() {
        let cli = Cli::parse_from(["topic-rag", "ingest", "./data"]);
        match cli.command {
            Commands::Ingest { dir } => assert_eq!(dir, "./data"),
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "topic-rag",
            "status",
            "--config",
            "/path/to/config.toml",
            "--log-level",
            "debug",
            "--index-path",
            "/custom/index",
        ]);
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert_eq!(cli.index_path, Some("/custom/index".to_string()));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["topic-rag"]).is_err());
    }
}
