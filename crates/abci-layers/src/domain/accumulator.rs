//! # App-Hash Accumulator
//!
//! Chained streaming digest producing one app hash per block.
//!
//! ```text
//! digest = H( prev_hash ‖ tx_1 ‖ … ‖ tx_n ‖ "{" hex(height) "}" )[..20]
//! ```
//!
//! where `H` is SHA-256 and `tx_i` are the transactions the wrapped
//! application accepted in `DeliverTx`, in delivery order. `prev_hash` is
//! omitted while it is empty (fresh store, no genesis). The height marker
//! uses lowercase hex without padding. Both the marker and the truncation
//! length are part of the consensus-visible hash.
//!
//! ## Persisted Records
//!
//! | Key | Value |
//! |-----|-------|
//! | `info` | JSON `{"hash":"<hex>","height":<n>}` |
//! | `bcseed` | optional genesis seed bytes |

use super::config::HashConfig;
use super::errors::{LayerError, LayerResult};
use super::types::Height;
use crate::ports::outbound::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};

/// Store key of the last committed `(hash, height)`.
pub const INFO_KEY: &[u8] = b"info";

/// Store key of the optional genesis seed.
pub const GENESIS_SEED_KEY: &[u8] = b"bcseed";

/// The last committed `(hash, height)` as persisted.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedInfo {
    #[serde_as(as = "Hex")]
    pub hash: Vec<u8>,
    pub height: Height,
}

impl PersistedInfo {
    pub fn to_bytes(&self) -> LayerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LayerError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> LayerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| LayerError::CorruptState(e.to_string()))
    }
}

/// Streaming SHA-256 whose output is cut to a fixed length.
#[derive(Clone)]
pub struct TruncatedDigest {
    hasher: Sha256,
    len: usize,
}

impl TruncatedDigest {
    pub fn new(len: usize) -> Self {
        Self {
            hasher: Sha256::new(),
            len,
        }
    }

    pub fn write(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Truncated output of everything written so far.
    pub fn sum(&self) -> Vec<u8> {
        let full = self.hasher.clone().finalize();
        full[..self.len].to_vec()
    }
}

/// One-shot truncated digest.
pub fn truncated_digest(data: &[u8], len: usize) -> Vec<u8> {
    let mut digest = TruncatedDigest::new(len);
    digest.write(data);
    digest.sum()
}

/// Height marker written into the digest at commit, e.g. `{1a}`.
pub fn height_marker(height: Height) -> String {
    format!("{{{:x}}}", height)
}

/// Chained app-hash state for one chain.
pub struct HashAccumulator<S: KeyValueStore> {
    store: S,
    config: HashConfig,
    last_hash: Vec<u8>,
    last_height: Height,
    pending_height: Height,
    digest: TruncatedDigest,
}

impl<S: KeyValueStore> HashAccumulator<S> {
    pub fn new(store: S, config: HashConfig) -> LayerResult<Self> {
        config.validate()?;
        let digest = TruncatedDigest::new(config.truncated_len);
        Ok(Self {
            store,
            config,
            last_hash: Vec::new(),
            last_height: 0,
            pending_height: 0,
            digest,
        })
    }

    /// Load the persisted `(hash, height)`, or start empty at height 0.
    pub fn start(&mut self) -> LayerResult<()> {
        match self.store.get(INFO_KEY)? {
            Some(bytes) => {
                let info = PersistedInfo::from_bytes(&bytes)?;
                self.last_hash = info.hash;
                self.last_height = info.height;
                tracing::info!(
                    "[app-hash] resumed at height {} hash {}",
                    self.last_height,
                    hex::encode(&self.last_hash)
                );
            }
            None => {
                self.last_hash.clear();
                self.last_height = 0;
                tracing::info!("[app-hash] no persisted state, starting empty");
            }
        }
        self.pending_height = self.last_height;
        self.reseed();
        Ok(())
    }

    /// Derive the genesis hash from `seed ‖ genesis_state`.
    ///
    /// Either part may be absent; with both absent the hash is the digest of
    /// the empty input.
    pub fn init_chain(&mut self, seed: Option<&[u8]>, genesis_state: &[u8]) {
        let mut base = TruncatedDigest::new(self.config.truncated_len);
        if let Some(seed) = seed {
            base.write(seed);
        }
        if !genesis_state.is_empty() {
            base.write(genesis_state);
        }
        self.last_hash = base.sum();
        self.last_height = 0;
        self.pending_height = 0;
        self.reseed();
        tracing::info!("[app-hash] genesis hash {}", hex::encode(&self.last_hash));
    }

    /// Feed a transaction the wrapped application accepted.
    pub fn on_delivered_tx(&mut self, tx: &[u8]) {
        self.digest.write(tx);
    }

    /// Remember the height of the block being closed.
    pub fn on_end_block(&mut self, height: Height) {
        self.pending_height = height;
    }

    /// Finalize the block, persist `(hash, height)` and return the hash.
    ///
    /// State only advances once the record is durable; on error the
    /// accumulator still reports the previous commit.
    pub fn on_commit(&mut self) -> LayerResult<Vec<u8>> {
        let mut finished = self.digest.clone();
        finished.write(height_marker(self.pending_height).as_bytes());
        let hash = finished.sum();

        let info = PersistedInfo {
            hash: hash.clone(),
            height: self.pending_height,
        };
        let mut batch = self.store.new_batch();
        batch.set(INFO_KEY, info.to_bytes()?);
        self.store.write_sync(batch)?;

        self.last_hash = hash.clone();
        self.last_height = self.pending_height;
        self.reseed();
        Ok(hash)
    }

    /// `(last_height, last_hash)` of the last successful commit.
    pub fn info(&self) -> (Height, Vec<u8>) {
        (self.last_height, self.last_hash.clone())
    }

    fn reseed(&mut self) {
        self.digest = TruncatedDigest::new(self.config.truncated_len);
        if !self.last_hash.is_empty() {
            self.digest.write(&self.last_hash);
        }
    }
}
