//! # Adapters
//!
//! Store implementations, a store-backed metadata resolver and test doubles
//! for the outbound/inbound ports.
//!
//! Production RocksDB storage lives in `abci-node` behind the `rocksdb`
//! feature.

pub mod file;
pub mod memory;
pub mod mock;
pub mod resolver;

pub use file::FileBackedKVStore;
pub use memory::InMemoryKVStore;
pub use mock::{CallLog, FaultyKVStore, ScriptedApp, SCRIPTED_REJECT_CODE};
pub use resolver::{KvMetadataResolver, MEDIA_KEY_PREFIX};
