//! # RocksDB Storage Adapter
//!
//! Persistent [`KeyValueStore`] backed by a single RocksDB instance.
//!
//! - `write_sync` maps to one RocksDB `WriteBatch`, applied atomically and
//!   always fsynced
//! - single `set` calls are fsynced only when `sync_writes` is set
//! - range scans use a forward iterator seeked to the start key
//!
//! Layer records (`dedup*` bucket labels, `info`, `bcseed`) share the
//! default column family.

use abci_layers::{BatchOperation, KVStoreError, KeyValueStore, ScanResult, WriteBatch};
use parking_lot::RwLock;
use rocksdb::{Direction, IteratorMode, Options, WriteOptions, DB};
use std::path::{Path, PathBuf};

/// RocksDB configuration.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// fsync single `set` calls (default: true). Batches are always fsynced.
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/rocksdb"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small buffers, no fsync on `set`.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

fn io_error(op: &str, e: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", op, e),
    }
}

/// RocksDB-backed key-value store.
pub struct RocksDbStore {
    db: RwLock<DB>,
    config: RocksDbConfig,
}

impl RocksDbStore {
    /// Open or create a database.
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;

        Ok(Self {
            db: RwLock::new(db),
            config,
        })
    }

    pub fn open_default(path: impl AsRef<Path>) -> Result<Self, KVStoreError> {
        Self::open(RocksDbConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Whether a write must reach stable storage before returning.
    fn syncs(&self, batch: bool) -> bool {
        batch || self.config.sync_writes
    }

    fn write_options(&self, batch: bool) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.syncs(batch));
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        let db = self.db.read();
        db.get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        let db = self.db.read();
        db.get(key).map_err(|e| io_error("get", e))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let db = self.db.write();
        db.put_opt(key, value, &self.write_options(false))
            .map_err(|e| io_error("put", e))
    }

    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_operations() {
            match op {
                BatchOperation::Put { key, value } => rocks_batch.put(&key, &value),
                BatchOperation::Delete { key } => rocks_batch.delete(&key),
            }
        }

        let db = self.db.write();
        db.write_opt(rocks_batch, &self.write_options(true))
            .map_err(|e| io_error("batch write", e))
    }

    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut results = Vec::new();
        if start >= end {
            return Ok(results);
        }

        let db = self.db.read();
        for item in db.iterator(IteratorMode::From(start, Direction::Forward)) {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if &*key >= end {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }
}
