//! # Key/Value Reference Application
//!
//! Transient state machine over `key=value` transactions.
//!
//! - `check_tx` / `deliver_tx` reject anything that is not `key=value` with a
//!   non-empty key ([`CODE_MALFORMED`]).
//! - `deliver_tx` writes the pair into the working state.
//! - `commit` chains a [`Block`] of the delivered transactions to the
//!   previous app hash and returns its BLAKE3 hash.

use abci_layers::{
    Block, Height, LayerResult, RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx,
    ResponseCommit, ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain, Tx,
};
use abci_layers::Application;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

/// Response code for transactions that are not `key=value`.
pub const CODE_MALFORMED: u32 = 2;

const MALFORMED_LOG: &str = "expected key=value";

/// Split `key=value` at the first `=`. The key must be non-empty.
pub fn parse_kv(tx: &[u8]) -> Option<(&[u8], &[u8])> {
    let pos = tx.iter().position(|&b| b == b'=')?;
    let (key, value) = (&tx[..pos], &tx[pos + 1..]);
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

#[derive(Debug, Default)]
struct KvState {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    block_txs: Vec<Tx>,
    genesis: Vec<u8>,
    last_hash: Vec<u8>,
    last_height: Height,
    pending_height: Height,
}

/// In-memory key/value application.
#[derive(Default)]
pub struct KvStoreApp {
    state: Mutex<KvState>,
}

impl KvStoreApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key`, including uncommitted writes.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Application for KvStoreApp {
    fn start(&self) -> LayerResult<()> {
        Ok(())
    }

    fn info(&self, _request: &RequestInfo) -> LayerResult<ResponseInfo> {
        let state = self.state.lock();
        Ok(ResponseInfo {
            data: format!("kvstore entries={}", state.entries.len()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            last_block_height: state.last_height,
            last_block_app_hash: state.last_hash.clone(),
        })
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        self.state.lock().genesis = request.app_state_bytes.clone();
        Ok(ResponseInitChain {})
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        if parse_kv(tx).is_none() {
            return Ok(ResponseCheckTx::rejected(CODE_MALFORMED, MALFORMED_LOG));
        }
        Ok(ResponseCheckTx::ok())
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        let Some((key, value)) = parse_kv(tx) else {
            return Ok(ResponseDeliverTx::rejected(CODE_MALFORMED, MALFORMED_LOG));
        };

        let mut state = self.state.lock();
        state.entries.insert(key.to_vec(), value.to_vec());
        state.block_txs.push(tx.to_vec());
        Ok(ResponseDeliverTx::ok())
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.state.lock().pending_height = request.height;
        Ok(ResponseEndBlock {})
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        let mut state = self.state.lock();

        // Genesis state is only part of the first block.
        let genesis = if state.last_hash.is_empty() {
            state.genesis.clone()
        } else {
            Vec::new()
        };
        let block = Block {
            index: state.pending_height.to_string(),
            timestamp: String::new(),
            genesis,
            txs: std::mem::take(&mut state.block_txs),
            prev_hash: state.last_hash.clone(),
        };
        let hash = block.hash()?;
        debug!("[kvstore] committed {}", block);

        state.last_hash = hash.to_vec();
        state.last_height = state.pending_height;
        Ok(ResponseCommit {
            data: state.last_hash.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_block(app: &KvStoreApp, height: Height, txs: &[&[u8]]) -> Vec<u8> {
        for tx in txs {
            app.deliver_tx(tx).unwrap();
        }
        app.end_block(&RequestEndBlock { height }).unwrap();
        app.commit().unwrap().data
    }

    #[test]
    fn test_parse_kv() {
        assert_eq!(parse_kv(b"a=1"), Some((&b"a"[..], &b"1"[..])));
        assert_eq!(parse_kv(b"a="), Some((&b"a"[..], &b""[..])));
        assert_eq!(parse_kv(b"a=b=c"), Some((&b"a"[..], &b"b=c"[..])));
        assert_eq!(parse_kv(b"=1"), None);
        assert_eq!(parse_kv(b"plain"), None);
    }

    #[test]
    fn test_malformed_tx_rejected() {
        let app = KvStoreApp::new();
        assert_eq!(app.check_tx(b"nope").unwrap().code, CODE_MALFORMED);
        assert_eq!(app.deliver_tx(b"nope").unwrap().code, CODE_MALFORMED);
        assert!(app.is_empty());
    }

    #[test]
    fn test_deliver_writes_entry() {
        let app = KvStoreApp::new();
        assert!(app.check_tx(b"k=v").unwrap().is_ok());
        assert!(app.get(b"k").is_none());

        app.deliver_tx(b"k=v").unwrap();
        app.deliver_tx(b"k=w").unwrap();
        assert_eq!(app.get(b"k"), Some(b"w".to_vec()));
        assert_eq!(app.len(), 1);
    }

    #[test]
    fn test_commit_hash_chains_blocks() {
        let app = KvStoreApp::new();
        let first = commit_block(&app, 1, &[b"a=1"]);

        let expected_first = Block {
            index: "1".into(),
            txs: vec![b"a=1".to_vec()],
            ..Default::default()
        }
        .hash()
        .unwrap();
        assert_eq!(first, expected_first.to_vec());

        let second = commit_block(&app, 2, &[]);
        let expected_second = Block {
            index: "2".into(),
            prev_hash: first,
            ..Default::default()
        }
        .hash()
        .unwrap();
        assert_eq!(second, expected_second.to_vec());
    }

    #[test]
    fn test_genesis_state_only_in_first_block() {
        let with_genesis = KvStoreApp::new();
        with_genesis
            .init_chain(&RequestInitChain {
                chain_id: "c".into(),
                app_state_bytes: b"genesis".to_vec(),
            })
            .unwrap();
        let plain = KvStoreApp::new();

        let a = commit_block(&with_genesis, 1, &[]);
        let b = commit_block(&plain, 1, &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_info_reports_last_commit() {
        let app = KvStoreApp::new();
        let hash = commit_block(&app, 4, &[b"x=y"]);

        let info = app.info(&RequestInfo::default()).unwrap();
        assert_eq!(info.last_block_height, 4);
        assert_eq!(info.last_block_app_hash, hash);
        assert_eq!(info.data, "kvstore entries=1");
    }
}
