//! Optimized storage layer using RocksDB

use crate::config::StorageConfig;
use crate::errors::{CasinoResult, StorageError};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct OptimizedStorage {
    db: Arc<DB>,
}

impl OptimizedStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, rocksdb::Error> {
        Self::open(path, 64)
    }

    /// Open using the storage section of the config, wiping the directory
    /// first when `clear_on_start` is set
    pub fn new_with_config(config: &StorageConfig) -> CasinoResult<Self> {
        let path = Path::new(&config.data_directory);
        if config.clear_on_start && path.exists() {
            tracing::warn!(path = %config.data_directory, "Clearing database on start");
            std::fs::remove_dir_all(path).map_err(|e| {
                StorageError::DatabaseOpenFailed(format!(
                    "failed to clear {}: {}",
                    config.data_directory, e
                ))
            })?;
        }

        Self::open(path, config.write_buffer_size_mb)
            .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()).into())
    }

    fn open<P: AsRef<Path>>(path: P, write_buffer_mb: usize) -> Result<Self, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(write_buffer_mb.max(1) * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> CasinoResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()).into())
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> CasinoResult<()> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    /// Apply a batch atomically: either every operation lands or none does
    pub fn write(&self, batch: WriteBatch) -> CasinoResult<()> {
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    /// Collect up to `limit` entries whose key starts with `prefix`, in key order
    pub fn scan_prefix(&self, prefix: &[u8], limit: usize) -> CasinoResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            if entries.len() >= limit {
                break;
            }
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }
}
