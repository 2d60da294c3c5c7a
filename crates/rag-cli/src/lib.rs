//! topic-rag command-line front end.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (chat, ask, ingest, status)
//! - `session`: Per-conversation state threading

pub mod cli;
pub mod commands;
pub mod session;

pub use cli::{Cli, Commands};
pub use commands::{init_tracing, load_settings, run_ask, run_chat, run_ingest, show_status};
pub use session::{format_reply, load_state, save_state, ChatSession};
