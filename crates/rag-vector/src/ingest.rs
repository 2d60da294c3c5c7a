//! Document ingestion: file loading and chunking.

use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use rag_types::IngestSettings;

use crate::error::VectorError;

/// File extensions read as plain text.
const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Text of one source file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the ingestion root
    pub source: String,
    pub text: String,
}

/// A chunk waiting to be embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPassage {
    pub source: String,
    pub content: String,
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    pub files_read: usize,
    /// Unsupported or unreadable files
    pub files_skipped: usize,
    /// Chunks produced before filtering
    pub chunks_total: usize,
    /// Chunks shorter than the minimum after trimming
    pub chunks_dropped: usize,
    pub passages_added: usize,
}

/// Split `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
///
/// The last window may be shorter. Counts are in characters, not bytes.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}

/// Read every `.txt` and `.md` file under `dir`, recursively.
///
/// Returns the documents and the number of files skipped. Unsupported and
/// unreadable files are skipped with a warning; a missing `dir` is an error.
pub fn load_documents(dir: &Path) -> Result<(Vec<SourceDocument>, usize), VectorError> {
    if !dir.is_dir() {
        return Err(VectorError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }

    let mut documents = Vec::new();
    let mut skipped = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let source = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !supported {
            warn!(file = %source, "Skipping unsupported file type");
            skipped += 1;
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(file = %source, chars = text.len(), "Read text file");
                documents.push(SourceDocument { source, text });
            }
            Err(e) => {
                warn!(file = %source, error = %e, "Failed to read file");
                skipped += 1;
            }
        }
    }

    info!(files = documents.len(), skipped, "Loaded documents");
    Ok((documents, skipped))
}

/// Chunk documents and drop chunks that are too short once trimmed.
///
/// Returns the kept passages (trimmed) and the number dropped.
pub fn split_documents(
    documents: &[SourceDocument],
    settings: &IngestSettings,
) -> (Vec<PendingPassage>, usize) {
    let mut passages = Vec::new();
    let mut dropped = 0;

    for document in documents {
        let chunks = chunk_text(&document.text, settings.chunk_size, settings.chunk_overlap);
        let before = passages.len();

        for chunk in chunks {
            let content = chunk.trim();
            if content.chars().count() < settings.min_chunk_chars {
                dropped += 1;
                continue;
            }
            passages.push(PendingPassage {
                source: document.source.clone(),
                content: content.to_string(),
            });
        }

        debug!(
            file = %document.source,
            kept = passages.len() - before,
            "Split document into passages"
        );
    }

    (passages, dropped)
}
