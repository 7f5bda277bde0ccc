//! # Layer Stack Integration Tests
//!
//! Drives the full `DedupLayer<HashCounterLayer<App>>` stack through the
//! consensus and mempool call streams over a shared store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use abci_layers::adapters::ScriptedApp;
use abci_layers::{
    truncated_digest, Application, BatchOperation, DedupBucketIndex, DedupConfig, DedupLayer,
    FileBackedKVStore, HashConfig, HashCounterLayer, InMemoryKVStore, KVStoreError,
    KeyValueStore, RequestEndBlock, RequestInfo, RequestInitChain, ScanResult, Scope, WriteBatch,
    DEFAULT_REJECT_CODE,
};
use proptest::prelude::*;

type Stack<S> = DedupLayer<HashCounterLayer<ScriptedApp, Arc<S>>, Arc<S>>;

fn stack<S: KeyValueStore>(store: &Arc<S>) -> Stack<S> {
    let app = HashCounterLayer::new(ScriptedApp::new(), store.clone(), HashConfig::default())
        .unwrap();
    let app = DedupLayer::new(app, store.clone(), DedupConfig::default()).unwrap();
    app.start().unwrap();
    app
}

fn close_block<A: Application>(app: &A, height: u64) -> Vec<u8> {
    app.end_block(&RequestEndBlock { height }).unwrap();
    app.commit().unwrap().data
}

#[test]
fn test_mempool_duplicates_forgotten_after_commit() {
    let store = Arc::new(InMemoryKVStore::new());
    let app = stack(&store);

    assert_eq!(app.check_tx(b"foo").unwrap().code, 0);
    assert_eq!(app.check_tx(b"foo").unwrap().code, DEFAULT_REJECT_CODE);

    close_block(&app, 1);

    assert_eq!(app.check_tx(b"foo").unwrap().code, 0);
}

#[test]
fn test_block_duplicates_persist_across_blocks() {
    let store = Arc::new(InMemoryKVStore::new());
    let app = stack(&store);

    assert_eq!(app.deliver_tx(b"foo").unwrap().code, 0);
    assert_eq!(app.deliver_tx(b"foo").unwrap().code, DEFAULT_REJECT_CODE);
    close_block(&app, 1);

    assert_eq!(app.deliver_tx(b"foo").unwrap().code, DEFAULT_REJECT_CODE);
    close_block(&app, 2);

    // The application itself only ever saw the first delivery.
    assert_eq!(app.inner().inner().calls().delivered.len(), 1);
}

#[test]
fn test_genesis_then_empty_block_hash() {
    let store = Arc::new(InMemoryKVStore::new());
    let app = stack(&store);

    app.init_chain(&RequestInitChain::default()).unwrap();
    let genesis = app.info(&RequestInfo::default()).unwrap().last_block_app_hash;
    assert_eq!(genesis, truncated_digest(b"", 20));
    assert_eq!(hex::encode(&genesis), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4");

    let hash = close_block(&app, 1);
    let mut expected_input = genesis;
    expected_input.extend_from_slice(b"{1}");
    assert_eq!(hash, truncated_digest(&expected_input, 20));
    assert_eq!(hex::encode(&hash), "5f80aa564fd646084222099236fd817492aa8012");
}

#[test]
fn test_duplicates_do_not_change_app_hash() {
    let with_dup_store = Arc::new(InMemoryKVStore::new());
    let with_dup = stack(&with_dup_store);
    let clean_store = Arc::new(InMemoryKVStore::new());
    let clean = stack(&clean_store);

    for app in [&with_dup, &clean] {
        app.init_chain(&RequestInitChain::default()).unwrap();
        app.deliver_tx(b"a").unwrap();
    }
    with_dup.deliver_tx(b"a").unwrap();

    assert_eq!(close_block(&with_dup, 1), close_block(&clean, 1));
}

#[test]
fn test_restart_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    let (committed_hash, committed_height) = {
        let store = Arc::new(FileBackedKVStore::open(&path).unwrap());
        let app = stack(&store);
        app.init_chain(&RequestInitChain::default()).unwrap();
        app.deliver_tx(b"foo").unwrap();
        let hash = close_block(&app, 1);
        app.deliver_tx(b"bar").unwrap();
        close_block(&app, 2);
        let info = app.info(&RequestInfo::default()).unwrap();
        assert_ne!(info.last_block_app_hash, hash);
        (info.last_block_app_hash, info.last_block_height)
    };

    let store = Arc::new(FileBackedKVStore::open(&path).unwrap());
    let app = stack(&store);
    let info = app.info(&RequestInfo::default()).unwrap();
    assert_eq!(info.last_block_height, committed_height);
    assert_eq!(info.last_block_app_hash, committed_hash);

    assert_eq!(app.deliver_tx(b"foo").unwrap().code, DEFAULT_REJECT_CODE);
    assert_eq!(app.check_tx(b"bar").unwrap().code, DEFAULT_REJECT_CODE);
    assert_eq!(app.deliver_tx(b"baz").unwrap().code, 0);
}

/// Store that dies before persisting any bucket record once `crash` is set.
#[derive(Default)]
struct CrashBeforeBuckets {
    inner: InMemoryKVStore,
    crash: AtomicBool,
}

impl KeyValueStore for CrashBeforeBuckets {
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.inner.has(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.inner.set(key, value)
    }

    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError> {
        let touches_buckets = batch.clone().into_operations().iter().any(|op| match op {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => {
                key.starts_with(b"dedup")
            }
        });
        if touches_buckets && self.crash.load(Ordering::SeqCst) {
            return Err(KVStoreError::IOError {
                message: "crashed".into(),
            });
        }
        self.inner.write_sync(batch)
    }

    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.inner.iterate(start, end)
    }
}

#[test]
fn test_crash_between_info_and_bucket_flush() {
    let store = Arc::new(CrashBeforeBuckets::default());
    {
        let app = stack(&store);
        app.init_chain(&RequestInitChain::default()).unwrap();
        app.deliver_tx(b"foo").unwrap();
        store.crash.store(true, Ordering::SeqCst);
        app.end_block(&RequestEndBlock { height: 1 }).unwrap();
        assert!(app.commit().is_err());
    }
    store.crash.store(false, Ordering::SeqCst);

    // `info` made it, the bucket records of block 1 did not.
    let app = stack(&store);
    assert_eq!(app.info(&RequestInfo::default()).unwrap().last_block_height, 1);
    assert_eq!(app.deliver_tx(b"foo").unwrap().code, 0);
}

#[test]
fn test_uncommitted_block_is_lost_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");

    {
        let store = Arc::new(FileBackedKVStore::open(&path).unwrap());
        let app = stack(&store);
        app.init_chain(&RequestInitChain::default()).unwrap();
        close_block(&app, 1);
        app.deliver_tx(b"foo").unwrap();
        app.end_block(&RequestEndBlock { height: 2 }).unwrap();
    }

    let store = Arc::new(FileBackedKVStore::open(&path).unwrap());
    let app = stack(&store);
    assert_eq!(app.info(&RequestInfo::default()).unwrap().last_block_height, 1);
    assert_eq!(app.deliver_tx(b"foo").unwrap().code, 0);
}

proptest! {
    #[test]
    fn prop_no_false_positive_duplicates(
        recorded in prop::collection::btree_set(prop::collection::vec(any::<u8>(), 0..8), 0..64),
        candidate in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        prop_assume!(!recorded.contains(&candidate));

        let config = DedupConfig { bucket_bits: 4, ..Default::default() };
        let index = DedupBucketIndex::new(InMemoryKVStore::new(), config).unwrap();
        for key in &recorded {
            index.record(Scope::Block, key);
        }
        prop_assert!(!index.lookup(Scope::Block, &candidate).unwrap());

        index.flush(Scope::Block).unwrap();
        prop_assert!(!index.lookup(Scope::Block, &candidate).unwrap());
        prop_assert!(!index.lookup(Scope::Mempool, &candidate).unwrap());
    }

    #[test]
    fn prop_app_hash_is_deterministic(
        blocks in prop::collection::vec(
            prop::collection::vec(prop::collection::vec(any::<u8>(), 1..6), 0..5),
            1..5,
        ),
    ) {
        let first_store = Arc::new(InMemoryKVStore::new());
        let first = stack(&first_store);
        let second_store = Arc::new(InMemoryKVStore::new());
        let second = stack(&second_store);

        for app in [&first, &second] {
            app.init_chain(&RequestInitChain::default()).unwrap();
        }

        for (i, txs) in blocks.iter().enumerate() {
            let height = i as u64 + 1;
            for tx in txs {
                let a = first.deliver_tx(tx).unwrap().code;
                let b = second.deliver_tx(tx).unwrap().code;
                prop_assert_eq!(a, b);
            }
            prop_assert_eq!(close_block(&first, height), close_block(&second, height));
        }
    }
}
