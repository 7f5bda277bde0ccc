use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult, WriteBatch};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::ops::Bound;
use std::path::{Path, PathBuf};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// File-backed key-value store for nodes without RocksDB.
///
/// The whole table is kept in memory and rewritten on every write through
/// a temp file, `sync_all` and rename, so a write is durable when it returns
/// and a crash leaves either the old or the new table on disk.
///
/// Format: `[key_len:u32 LE][key][value_len:u32 LE][value]...`
pub struct FileBackedKVStore {
    data: RwLock<Table>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating it empty if the file is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let data = Self::load_from_file(&path)?;
            tracing::info!("[kv-store] loaded {} keys from {}", data.len(), path.display());
            data
        } else {
            tracing::info!("[kv-store] no storage file at {}, starting empty", path.display());
            Table::new()
        };

        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> Result<Table, KVStoreError> {
        let mut bytes = Vec::new();
        std::fs::File::open(path)
            .and_then(|mut file| file.read_to_end(&mut bytes))
            .map_err(io_error)?;

        let mut data = Table::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key = read_chunk(&bytes, &mut cursor)?;
            let value = read_chunk(&bytes, &mut cursor)?;
            data.insert(key, value);
        }
        Ok(data)
    }

    fn save_to_file(&self, data: &Table) -> Result<(), KVStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut bytes = Vec::new();
        for (key, value) in data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_error)?;
        sync_parent_dir(&self.path)
    }
}

/// fsync the directory holding `path` so a completed rename survives a crash.
fn sync_parent_dir(path: &Path) -> Result<(), KVStoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(io_error)
}

fn read_chunk(bytes: &[u8], cursor: &mut usize) -> Result<Vec<u8>, KVStoreError> {
    let at = *cursor;
    let truncated = || KVStoreError::IOError {
        message: format!("storage file truncated at byte {}", at),
    };

    let len_bytes: [u8; 4] = bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(truncated)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let chunk = bytes
        .get(at + 4..at + 4 + len)
        .ok_or_else(truncated)?
        .to_vec();
    *cursor = at + 4 + len;
    Ok(chunk)
}

fn io_error(e: std::io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: e.to_string(),
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::new();
        batch.set(key, value);
        self.write_sync(batch)
    }

    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError> {
        let mut data = self.data.write();
        let mut next = data.clone();
        for op in batch.into_operations() {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        // Memory only moves forward once the file is durable.
        self.save_to_file(&next)?;
        *data = next;
        Ok(())
    }

    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let store = FileBackedKVStore::open(&path).unwrap();
            store.set(b"info", b"{}").unwrap();
            let mut batch = store.new_batch();
            batch.set(b"dedup000001".to_vec(), b"foo".to_vec());
            batch.set(b"dedup000002".to_vec(), b"bar".to_vec());
            store.write_sync(batch).unwrap();
        }

        let reopened = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"info").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(reopened.iterate(b"dedup\x00", b"dedup\xff").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedKVStore::open(dir.path().join("absent.bin")).unwrap();
        assert!(!store.has(b"info").unwrap());
    }

    #[test]
    fn test_truncated_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.bin");
        std::fs::write(&path, [5u8, 0, 0, 0, b'a']).unwrap();

        assert!(FileBackedKVStore::open(&path).is_err());
    }

    #[test]
    fn test_save_into_nested_dir_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node").join("state").join("store.bin");

        let store = FileBackedKVStore::open(&path).unwrap();
        store.set(b"info", b"{}").unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert!(sync_parent_dir(&path).is_ok());
        assert!(sync_parent_dir(Path::new("store.bin")).is_ok());
        let reopened = FileBackedKVStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"info").unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn test_delete_in_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBackedKVStore::open(dir.path().join("store.bin")).unwrap();
        store.set(b"a", b"1").unwrap();

        let mut batch = store.new_batch();
        batch.delete(b"a".to_vec());
        store.write_sync(batch).unwrap();

        assert_eq!(store.get(b"a").unwrap(), None);
    }
}
