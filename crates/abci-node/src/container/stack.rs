//! # Layer Container
//!
//! Opens the configured store and assembles the layer stack around the
//! key/value application.
//!
//! ```text
//! HashMode::Counter:  DedupLayer ─→ HashCounterLayer ─→ KvStoreApp
//! HashMode::Memory:   DedupLayer ─→ HashMemoryLayer  ─→ KvStoreApp
//! ```
//!
//! Both layers share one store; their records do not overlap (`dedup*`
//! bucket labels vs. `info` / `bcseed`).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use abci_layers::{
    Application, DedupLayer, FileBackedKVStore, HashConfig, HashCounterLayer, HashMemoryLayer,
    InMemoryKVStore, KVStoreError, KeyValueStore, LayerError,
};
use thiserror::Error;
use tracing::info;

use crate::app::KvStoreApp;
use crate::container::config::{ConfigError, HashMode, NodeConfig, StorageBackend};

/// Store shared by every layer.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// File name of the file-backed store inside `data_dir`.
pub const STATE_FILE: &str = "abci-state.db";

/// Directory name of the RocksDB store inside `data_dir`.
pub const ROCKSDB_DIR: &str = "rocksdb";

/// Node assembly failure.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Creating data directory {path:?} failed: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] KVStoreError),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// The store and the fully wrapped application.
pub struct LayerContainer {
    store: SharedStore,
    app: Box<dyn Application>,
}

impl LayerContainer {
    /// Validate `config`, open its store and build the stack.
    pub fn new(config: &NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let store = open_store(config)?;
        Self::with_store(config, store)
    }

    /// Build the stack over an already opened store.
    pub fn with_store(config: &NodeConfig, store: SharedStore) -> Result<Self, NodeError> {
        config.validate()?;
        let app = build_stack(config, store.clone())?;
        Ok(Self { store, app })
    }

    pub fn app(&self) -> &dyn Application {
        self.app.as_ref()
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

/// Open the store selected by `config.backend`.
pub fn open_store(config: &NodeConfig) -> Result<SharedStore, NodeError> {
    if config.backend != StorageBackend::Memory {
        fs::create_dir_all(&config.data_dir).map_err(|source| NodeError::DataDir {
            path: config.data_dir.clone(),
            source,
        })?;
    }

    match config.backend {
        StorageBackend::Memory => {
            info!("[node] using in-memory store");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        StorageBackend::File => {
            let path = config.data_dir.join(STATE_FILE);
            info!("[node] using file store at {}", path.display());
            Ok(Arc::new(FileBackedKVStore::open(path)?))
        }
        StorageBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &NodeConfig) -> Result<SharedStore, NodeError> {
    use crate::adapters::storage::{RocksDbConfig, RocksDbStore};

    let rocks_config = RocksDbConfig {
        path: config.data_dir.join(ROCKSDB_DIR),
        sync_writes: config.sync_writes,
        ..Default::default()
    };
    info!("[node] using RocksDB at {}", rocks_config.path.display());
    Ok(Arc::new(RocksDbStore::open(rocks_config)?))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &NodeConfig) -> Result<SharedStore, NodeError> {
    Err(ConfigError::RocksDbDisabled.into())
}

/// Wrap a fresh [`KvStoreApp`] in the layers selected by `config`.
pub fn build_stack(
    config: &NodeConfig,
    store: SharedStore,
) -> Result<Box<dyn Application>, LayerError> {
    let app: Box<dyn Application> = match config.hash_mode {
        HashMode::Counter => {
            let counter =
                HashCounterLayer::new(KvStoreApp::new(), store.clone(), HashConfig::default())?;
            if let Some(seed) = &config.genesis_seed {
                counter.store_genesis_seed(seed)?;
            }
            Box::new(DedupLayer::new(counter, store, config.dedup.clone())?)
        }
        HashMode::Memory => {
            let memory = HashMemoryLayer::new(KvStoreApp::new());
            Box::new(DedupLayer::new(memory, store, config.dedup.clone())?)
        }
    };
    info!(
        "[node] layer stack ready (hash mode {:?}, {} bucket bits)",
        config.hash_mode, config.dedup.bucket_bits
    );
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abci_layers::{RequestEndBlock, RequestInfo, RequestInitChain, GENESIS_SEED_KEY};

    fn memory_config(hash_mode: HashMode) -> NodeConfig {
        NodeConfig {
            backend: StorageBackend::Memory,
            hash_mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_counter_stack_dedups_and_hashes() {
        let container = LayerContainer::new(&memory_config(HashMode::Counter)).unwrap();
        let app = container.app();
        app.start().unwrap();
        app.init_chain(&RequestInitChain::default()).unwrap();

        assert_eq!(app.deliver_tx(b"a=1").unwrap().code, 0);
        assert_eq!(app.deliver_tx(b"a=1").unwrap().code, 1);
        assert_eq!(app.deliver_tx(b"nope").unwrap().code, crate::app::CODE_MALFORMED);
        app.end_block(&RequestEndBlock { height: 1 }).unwrap();
        let commit = app.commit().unwrap();

        assert_eq!(commit.data.len(), 20);
        let info = app.info(&RequestInfo::default()).unwrap();
        assert_eq!(info.last_block_height, 1);
        assert_eq!(info.last_block_app_hash, commit.data);
    }

    #[test]
    fn test_memory_stack_reports_block_hash() {
        let container = LayerContainer::new(&memory_config(HashMode::Memory)).unwrap();
        let app = container.app();
        app.start().unwrap();
        app.deliver_tx(b"a=1").unwrap();
        app.end_block(&RequestEndBlock { height: 1 }).unwrap();

        assert_eq!(app.commit().unwrap().data.len(), 32);
    }

    #[test]
    fn test_genesis_seed_is_stored() {
        let config = NodeConfig {
            genesis_seed: Some(b"seed".to_vec()),
            ..memory_config(HashMode::Counter)
        };
        let container = LayerContainer::new(&config).unwrap();
        assert_eq!(
            container.store().get(GENESIS_SEED_KEY).unwrap(),
            Some(b"seed".to_vec())
        );
    }

    #[test]
    fn test_file_store_created_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().join("nested"),
            backend: StorageBackend::File,
            ..Default::default()
        };

        let container = LayerContainer::new(&config).unwrap();
        let app = container.app();
        app.start().unwrap();
        app.end_block(&RequestEndBlock { height: 1 }).unwrap();
        app.commit().unwrap();

        assert!(config.data_dir.join(STATE_FILE).exists());
    }

    #[test]
    fn test_memory_hash_on_file_store_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            data_dir: dir.path().to_path_buf(),
            backend: StorageBackend::File,
            hash_mode: HashMode::Memory,
            ..Default::default()
        };
        assert!(matches!(
            LayerContainer::new(&config),
            Err(NodeError::Config(ConfigError::MemoryHashNeedsMemoryStore(_)))
        ));
        assert!(!dir.path().join(STATE_FILE).exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = memory_config(HashMode::Counter);
        config.dedup.bucket_bits = 0;
        assert!(matches!(
            LayerContainer::new(&config),
            Err(NodeError::Config(ConfigError::Layers(_)))
        ));
    }
}
