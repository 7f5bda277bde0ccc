//! # Node Configuration
//!
//! Runtime parameters, read from `ABCI_*` environment variables.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ABCI_DATA_DIR` | `data_dir` | `./data` |
//! | `ABCI_STORE_BACKEND` | `backend` (`memory`, `file`, `rocksdb`) | `file` |
//! | `ABCI_HASH_MODE` | `hash_mode` (`counter`, `memory`) | `counter` |
//! | `ABCI_DEDUP_BITS` | `dedup.bucket_bits` | 24 |
//! | `ABCI_GENESIS_SEED` | `genesis_seed` (hex) | none |
//! | `ABCI_SYNC_WRITES` | `sync_writes` | `true` |
//! | `ABCI_CHAIN_ID` | `chain_id` | `abci-local` |
//!
//! Unparsable values are logged and the default is kept.

use abci_layers::DedupConfig;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Where committed state lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Lost on exit.
    Memory,
    /// Single file under `data_dir`.
    #[default]
    File,
    /// RocksDB directory under `data_dir` (feature `rocksdb`).
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "rocksdb" => Ok(Self::RocksDb),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Which layer provides the app hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashMode {
    /// `HashCounterLayer`: chained digest, persisted.
    #[default]
    Counter,
    /// `HashMemoryLayer`: the application's own block hash. Its height is
    /// not persisted, so it only runs on the memory backend.
    Memory,
}

impl FromStr for HashMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(Self::Counter),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::UnknownHashMode(s.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown storage backend '{0}' (expected memory, file or rocksdb)")]
    UnknownBackend(String),

    #[error("unknown hash mode '{0}' (expected counter or memory)")]
    UnknownHashMode(String),

    #[error("{var} is invalid: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("RocksDB backend requested but the node was built without the `rocksdb` feature")]
    RocksDbDisabled,

    #[error("hash mode memory needs the memory storage backend, got {0:?}")]
    MemoryHashNeedsMemoryStore(StorageBackend),

    #[error(transparent)]
    Layers(#[from] abci_layers::ConfigError),
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub backend: StorageBackend,
    pub hash_mode: HashMode,
    pub dedup: DedupConfig,
    /// Stored as `bcseed` before the first `init_chain`.
    pub genesis_seed: Option<Vec<u8>>,
    /// fsync single RocksDB `set` calls. Commit batches are always fsynced.
    pub sync_writes: bool,
    pub chain_id: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            backend: StorageBackend::default(),
            hash_mode: HashMode::default(),
            dedup: DedupConfig::default(),
            genesis_seed: None,
            sync_writes: true,
            chain_id: "abci-local".to_string(),
        }
    }
}

impl NodeConfig {
    /// Configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("ABCI_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("ABCI_STORE_BACKEND") {
            match backend.parse() {
                Ok(backend) => config.backend = backend,
                Err(e) => warn!("{}, keeping {:?}", e, config.backend),
            }
        }
        if let Some(mode) = lookup("ABCI_HASH_MODE") {
            match mode.parse() {
                Ok(mode) => config.hash_mode = mode,
                Err(e) => warn!("{}, keeping {:?}", e, config.hash_mode),
            }
        }
        if let Some(bits) = lookup("ABCI_DEDUP_BITS") {
            match bits.parse() {
                Ok(bits) => config.dedup.bucket_bits = bits,
                Err(_) => warn!("ABCI_DEDUP_BITS must be an integer, got '{}'", bits),
            }
        }
        if let Some(seed) = lookup("ABCI_GENESIS_SEED") {
            match hex::decode(&seed) {
                Ok(seed) => config.genesis_seed = Some(seed),
                Err(e) => warn!("ABCI_GENESIS_SEED must be hex: {}", e),
            }
        }
        if let Some(sync) = lookup("ABCI_SYNC_WRITES") {
            match sync.parse() {
                Ok(sync) => config.sync_writes = sync,
                Err(_) => warn!("ABCI_SYNC_WRITES must be true or false, got '{}'", sync),
            }
        }
        if let Some(chain_id) = lookup("ABCI_CHAIN_ID") {
            config.chain_id = chain_id;
        }

        config
    }

    /// Check the configuration can be run by this build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dedup.validate()?;
        if self.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::RocksDbDisabled);
        }
        // A restart would reset the height to 0 over bucket records that survived.
        if self.hash_mode == HashMode::Memory && self.backend != StorageBackend::Memory {
            return Err(ConfigError::MemoryHashNeedsMemoryStore(self.backend));
        }
        if self.chain_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "ABCI_CHAIN_ID",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
