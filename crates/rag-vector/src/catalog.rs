//! Passage catalog.
//!
//! Maps vector keys (u64) to passage text and provenance. Stored in RocksDB
//! next to the HNSW index so both survive restarts together.

use std::path::Path;

use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::VectorError;

/// Column family name for passages
pub const CF_PASSAGES: &str = "passages";

/// A chunk of source text, addressable by its vector key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Vector key in the HNSW index
    pub id: u64,
    /// Chunk text
    pub content: String,
    /// File the chunk came from
    #[serde(default)]
    pub source: Option<String>,
    /// Ingestion time (ms since epoch)
    pub created_at: i64,
}

impl Passage {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            source: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }
}

/// Passage storage using RocksDB.
pub struct PassageCatalog {
    db: DB,
}

impl PassageCatalog {
    /// Open or create the catalog.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorError> {
        let path = path.as_ref();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_PASSAGES, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        info!(path = ?path, "Opened passage catalog");
        Ok(Self { db })
    }

    fn cf(&self) -> Result<&ColumnFamily, VectorError> {
        self.db
            .cf_handle(CF_PASSAGES)
            .ok_or_else(|| VectorError::Index(format!("column family {} missing", CF_PASSAGES)))
    }

    pub fn put(&self, passage: &Passage) -> Result<(), VectorError> {
        let value =
            serde_json::to_vec(passage).map_err(|e| VectorError::Serialization(e.to_string()))?;
        self.db.put_cf(self.cf()?, passage.id.to_be_bytes(), value)?;
        debug!(id = passage.id, "Stored passage");
        Ok(())
    }

    /// Store several passages atomically.
    pub fn put_batch(&self, passages: &[Passage]) -> Result<(), VectorError> {
        let cf = self.cf()?;
        let mut batch = WriteBatch::default();
        for passage in passages {
            let value = serde_json::to_vec(passage)
                .map_err(|e| VectorError::Serialization(e.to_string()))?;
            batch.put_cf(cf, passage.id.to_be_bytes(), value);
        }
        self.db.write(batch)?;
        debug!(count = passages.len(), "Stored passage batch");
        Ok(())
    }

    pub fn get(&self, id: u64) -> Result<Option<Passage>, VectorError> {
        match self.db.get_cf(self.cf()?, id.to_be_bytes())? {
            Some(bytes) => {
                let passage: Passage = serde_json::from_slice(&bytes)
                    .map_err(|e| VectorError::Serialization(e.to_string()))?;
                Ok(Some(passage))
            }
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<usize, VectorError> {
        let mut count = 0;
        for item in self.db.iterator_cf(self.cf()?, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// One past the highest stored id, or 0 when empty.
    pub fn next_id(&self) -> Result<u64, VectorError> {
        match self.db.iterator_cf(self.cf()?, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    VectorError::Serialization(format!("bad passage key length {}", key.len()))
                })?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let temp = TempDir::new().unwrap();
        let catalog = PassageCatalog::open(temp.path()).unwrap();

        let passage = Passage::new(7, "Rust ownership rules").with_source(Some("rust.md".into()));
        catalog.put(&passage).unwrap();

        let loaded = catalog.get(7).unwrap().unwrap();
        assert_eq!(loaded, passage);
        assert!(catalog.get(8).unwrap().is_none());
    }

    #[test]
    fn test_batch_and_next_id() {
        let temp = TempDir::new().unwrap();
        let catalog = PassageCatalog::open(temp.path()).unwrap();
        assert_eq!(catalog.next_id().unwrap(), 0);

        let passages: Vec<Passage> = (0..3).map(|i| Passage::new(i, format!("p{}", i))).collect();
        catalog.put_batch(&passages).unwrap();
        // Big-endian keys sort numerically.
        catalog.put(&Passage::new(256, "later")).unwrap();

        assert_eq!(catalog.count().unwrap(), 4);
        assert_eq!(catalog.next_id().unwrap(), 257);
    }

    #[test]
    fn test_reopen_keeps_passages() {
        let temp = TempDir::new().unwrap();
        {
            let catalog = PassageCatalog::open(temp.path()).unwrap();
            catalog.put(&Passage::new(1, "kept")).unwrap();
        }
        let catalog = PassageCatalog::open(temp.path()).unwrap();
        assert_eq!(catalog.get(1).unwrap().unwrap().content, "kept");
    }
}
