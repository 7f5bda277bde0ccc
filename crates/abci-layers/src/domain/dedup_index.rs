//! # De-duplication Bucket Index
//!
//! Maps bucket labels to the full key that most recently claimed them.
//!
//! ```text
//!   lookup(scope, key)
//!        │
//!        ├─→ scope overlay (Mempool | Block)  ── hit ──→ compare bytes
//!        │         miss
//!        └─→ persistent store                ──────────→ compare bytes
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | No false positives | `lookup()` compares the stored key byte-for-byte |
//! | Bounded storage | labels come from [`bucket_label`], `2^bits` at most |
//! | Scope isolation | one overlay per scope, each behind its own lock |
//!
//! A second key landing in an occupied bucket overwrites the first. The
//! overwritten key can then be accepted again (false negative). Growing the
//! index to avoid this would give up the storage bound.

use super::bucket::{bucket_label, BUCKET_RANGE_END, BUCKET_RANGE_START};
use super::config::DedupConfig;
use super::errors::{KVStoreError, LayerResult};
use super::extractor::{extract_key, IdentityExtractor, KeyExtractor};
use super::types::Scope;
use crate::ports::outbound::KeyValueStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ephemeral, ordered overlay over the persistent store.
type Overlay = BTreeMap<Vec<u8>, Vec<u8>>;

/// Bounded bucket index backed by two overlays and a persistent store.
pub struct DedupBucketIndex<S: KeyValueStore> {
    store: S,
    extractor: Box<dyn KeyExtractor>,
    config: DedupConfig,
    mempool: Mutex<Overlay>,
    block: Mutex<Overlay>,
}

impl<S: KeyValueStore> DedupBucketIndex<S> {
    /// Index with the identity extractor.
    pub fn new(store: S, config: DedupConfig) -> LayerResult<Self> {
        Self::with_extractor(store, config, Box::new(IdentityExtractor))
    }

    pub fn with_extractor(
        store: S,
        config: DedupConfig,
        extractor: Box<dyn KeyExtractor>,
    ) -> LayerResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            extractor,
            config,
            mempool: Mutex::new(Overlay::new()),
            block: Mutex::new(Overlay::new()),
        })
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Normalized de-duplication key of `tx`. Never fails.
    pub fn extract(&self, tx: &[u8]) -> Vec<u8> {
        extract_key(self.extractor.as_ref(), tx)
    }

    /// `true` only if the bucket of `key` currently holds exactly `key`.
    pub fn lookup(&self, scope: Scope, key: &[u8]) -> Result<bool, KVStoreError> {
        let label = bucket_label(key, &self.config);
        let overlay = self.overlay(scope).lock();
        if let Some(occupant) = overlay.get(&label) {
            return Ok(occupant.as_slice() == key);
        }
        drop(overlay);

        Ok(self
            .store
            .get(&label)?
            .is_some_and(|occupant| occupant.as_slice() == key))
    }

    /// Claim the bucket of `key` in the scope's overlay.
    pub fn record(&self, scope: Scope, key: &[u8]) {
        let label = bucket_label(key, &self.config);
        self.overlay(scope).lock().insert(label, key.to_vec());
    }

    /// Persist the scope's bucket records in one durable batch and discard
    /// the overlay. Returns the number of records written.
    ///
    /// The overlay is only discarded once the batch is durable; on error it
    /// is left intact.
    pub fn flush(&self, scope: Scope) -> Result<usize, KVStoreError> {
        let mut overlay = self.overlay(scope).lock();

        let mut batch = self.store.new_batch();
        let range = (
            Bound::Included(BUCKET_RANGE_START.to_vec()),
            Bound::Excluded(BUCKET_RANGE_END.to_vec()),
        );
        for (label, key) in overlay.range::<Vec<u8>, _>(range) {
            batch.set(label.clone(), key.clone());
        }

        let written = batch.len();
        if written > 0 {
            self.store.write_sync(batch)?;
        }
        *overlay = Overlay::new();
        Ok(written)
    }

    /// Discard the scope's overlay without persisting it.
    pub fn reset(&self, scope: Scope) {
        *self.overlay(scope).lock() = Overlay::new();
    }

    /// Records currently held in the scope's overlay.
    pub fn pending(&self, scope: Scope) -> usize {
        self.overlay(scope).lock().len()
    }

    fn overlay(&self, scope: Scope) -> &Mutex<Overlay> {
        match scope {
            Scope::Mempool => &self.mempool,
            Scope::Block => &self.block,
        }
    }
}
