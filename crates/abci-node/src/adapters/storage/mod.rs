//! # Storage Adapters
//!
//! Production storage backends. The in-memory and file-backed stores come
//! from `abci-layers`.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature to use RocksDB:
//!
//! ```toml
//! abci-node = { path = "...", features = ["rocksdb"] }
//! ```

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

pub use abci_layers::adapters::{FileBackedKVStore, InMemoryKVStore};
