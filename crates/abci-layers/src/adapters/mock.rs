//! Test doubles for the ports.
//!
//! - [`ScriptedApp`]: wrapped application that records every call
//! - [`FaultyKVStore`]: store whose writes can be made to fail on demand

use crate::adapters::InMemoryKVStore;
use crate::domain::errors::{KVStoreError, LayerError, LayerResult};
use crate::domain::types::{
    Height, RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain, Tx,
};
use crate::ports::inbound::Application;
use crate::ports::outbound::{KeyValueStore, ScanResult, WriteBatch};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Response code [`ScriptedApp`] uses for rejected transactions.
pub const SCRIPTED_REJECT_CODE: u32 = 7;

/// Every call a [`ScriptedApp`] received, in order per stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub started: bool,
    pub init_chain: Vec<RequestInitChain>,
    pub checked: Vec<Tx>,
    pub delivered: Vec<Tx>,
    pub end_blocks: Vec<Height>,
    pub commits: usize,
}

/// Application double with programmable outcomes.
///
/// Transactions starting with `reject_prefix` are rejected with
/// [`SCRIPTED_REJECT_CODE`]. Commit returns `commit_hash`, and reports the
/// last end-block height through `info`.
pub struct ScriptedApp {
    reject_prefix: Option<Vec<u8>>,
    commit_hash: Mutex<Vec<u8>>,
    fail_commit: AtomicBool,
    calls: Mutex<CallLog>,
}

impl Default for ScriptedApp {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApp {
    /// Accepts every transaction.
    pub fn new() -> Self {
        Self {
            reject_prefix: None,
            commit_hash: Mutex::new(Vec::new()),
            fail_commit: AtomicBool::new(false),
            calls: Mutex::new(CallLog::default()),
        }
    }

    pub fn rejecting(prefix: &[u8]) -> Self {
        Self {
            reject_prefix: Some(prefix.to_vec()),
            ..Self::new()
        }
    }

    pub fn set_commit_hash(&self, hash: &[u8]) {
        *self.commit_hash.lock() = hash.to_vec();
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().clone()
    }

    fn rejects(&self, tx: &[u8]) -> bool {
        self.reject_prefix
            .as_deref()
            .is_some_and(|prefix| tx.starts_with(prefix))
    }
}

impl Application for ScriptedApp {
    fn start(&self) -> LayerResult<()> {
        self.calls.lock().started = true;
        Ok(())
    }

    fn info(&self, _request: &RequestInfo) -> LayerResult<ResponseInfo> {
        let calls = self.calls.lock();
        Ok(ResponseInfo {
            data: "scripted".into(),
            version: "0.0.0".into(),
            last_block_height: calls.end_blocks.last().copied().unwrap_or(0),
            last_block_app_hash: self.commit_hash.lock().clone(),
        })
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        self.calls.lock().init_chain.push(request.clone());
        Ok(ResponseInitChain {})
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        self.calls.lock().checked.push(tx.to_vec());
        if self.rejects(tx) {
            return Ok(ResponseCheckTx::rejected(SCRIPTED_REJECT_CODE, "scripted rejection"));
        }
        Ok(ResponseCheckTx::ok())
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        self.calls.lock().delivered.push(tx.to_vec());
        if self.rejects(tx) {
            return Ok(ResponseDeliverTx::rejected(SCRIPTED_REJECT_CODE, "scripted rejection"));
        }
        Ok(ResponseDeliverTx::ok())
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.calls.lock().end_blocks.push(request.height);
        Ok(ResponseEndBlock {})
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(LayerError::Application("scripted commit failure".into()));
        }
        self.calls.lock().commits += 1;
        Ok(ResponseCommit {
            data: self.commit_hash.lock().clone(),
        })
    }
}

/// In-memory store whose writes fail while `fail_writes` is set.
#[derive(Default)]
pub struct FaultyKVStore {
    inner: InMemoryKVStore,
    fail_writes: AtomicBool,
}

impl FaultyKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), KVStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KVStoreError::IOError {
                message: "injected write failure".into(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FaultyKVStore {
    fn has(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.inner.has(key)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.check_writable()?;
        self.inner.set(key, value)
    }

    fn write_sync(&self, batch: WriteBatch) -> Result<(), KVStoreError> {
        self.check_writable()?;
        self.inner.write_sync(batch)
    }

    fn iterate(&self, start: &[u8], end: &[u8]) -> Result<ScanResult, KVStoreError> {
        self.inner.iterate(start, end)
    }
}
