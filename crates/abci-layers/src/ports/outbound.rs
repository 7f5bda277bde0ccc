//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the layers require the host to provide.
//!
//! - [`KeyValueStore`]: durable point/range storage with synchronous batches
//! - [`MetadataResolver`]: content-store lookup for the validation layer

use crate::domain::errors::KVStoreError;
use crate::domain::media::MediaMeta;
use std::sync::Arc;

/// Ordered `(key, value)` pairs returned by a range scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for the durable key-value store.
///
/// Production: `RocksDbStore` (abci-node, feature `rocksdb`)
/// Local: [`FileBackedKVStore`](crate::adapters::FileBackedKVStore)
/// Testing: [`InMemoryKVStore`](crate::adapters::InMemoryKVStore)
///
/// All methods take `&self`; implementations synchronize internally so a
/// store can be shared by every layer of a stack.
pub trait KeyValueStore: Send + Sync {
    /// Check if a key exists.
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Apply a batch atomically and durably.
    ///
    /// Must not return before the batch is on stable storage.
    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError>;

    /// All pairs with `start <= key < end`, in ascending key order.
    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError>;

    /// Start an empty batch.
    fn new_batch(&self) -> WriteBatch {
        WriteBatch::default()
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        (**self).has(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        (**self).set(key, value)
    }

    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError> {
        (**self).write_sync(batch)
    }

    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        (**self).iterate(start, end)
    }
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

/// Pending writes, applied together by [`KeyValueStore::write_sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    operations: Vec<BatchOperation>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.operations.push(BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.operations
            .push(BatchOperation::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn into_operations(self) -> Vec<BatchOperation> {
        self.operations
    }
}

/// Failure to fetch or decode media metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveError {
    pub message: String,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ResolveError {}

/// Fetches and decrypts the metadata of a content-addressed media object.
///
/// The fetch goes to an external object store, so this is the one
/// non-deterministic input of a stack that includes the validation layer.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, object_id: &str, password: &[u8]) -> Result<MediaMeta, ResolveError>;
}
