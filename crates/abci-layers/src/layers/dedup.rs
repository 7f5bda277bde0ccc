//! # De-duplication Layer
//!
//! Rejects transactions whose key was already accepted, without invoking
//! the wrapped application.
//!
//! | Call | Scope | On duplicate | On wrapped acceptance |
//! |------|-------|--------------|-----------------------|
//! | `check_tx` | Mempool | reject code, no delegation | record key |
//! | `deliver_tx` | Block | reject code, no delegation | record key |
//! | `commit` | both | - | wrapped commit, flush Block, reset Mempool |
//!
//! Block-scope keys become persistent at commit and stay duplicates in every
//! later block. Mempool-scope keys are forgotten at every commit.

use crate::domain::config::DedupConfig;
use crate::domain::dedup_index::DedupBucketIndex;
use crate::domain::errors::LayerResult;
use crate::domain::extractor::KeyExtractor;
use crate::domain::types::{
    RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain, Scope,
};
use crate::ports::inbound::Application;
use crate::ports::outbound::KeyValueStore;
use tracing::{debug, error, info};

/// Log text attached to a duplicate rejection.
pub const DUPLICATE_LOG: &str = "duplicate transaction";

/// Application layer that de-duplicates transactions.
pub struct DedupLayer<A: Application, S: KeyValueStore> {
    app: A,
    index: DedupBucketIndex<S>,
}

impl<A: Application, S: KeyValueStore> DedupLayer<A, S> {
    /// Layer keyed on the raw transaction bytes.
    pub fn new(app: A, store: S, config: DedupConfig) -> LayerResult<Self> {
        Ok(Self {
            app,
            index: DedupBucketIndex::new(store, config)?,
        })
    }

    pub fn with_extractor(
        app: A,
        store: S,
        config: DedupConfig,
        extractor: Box<dyn KeyExtractor>,
    ) -> LayerResult<Self> {
        Ok(Self {
            app,
            index: DedupBucketIndex::with_extractor(store, config, extractor)?,
        })
    }

    pub fn inner(&self) -> &A {
        &self.app
    }

    pub fn index(&self) -> &DedupBucketIndex<S> {
        &self.index
    }

    fn reject_code(&self) -> u32 {
        self.index.config().reject_code
    }
}

impl<A: Application, S: KeyValueStore> Application for DedupLayer<A, S> {
    fn start(&self) -> LayerResult<()> {
        self.app.start()
    }

    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo> {
        self.app.info(request)
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        self.app.init_chain(request)
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        let key = self.index.extract(tx);
        if self.index.lookup(Scope::Mempool, &key)? {
            debug!("[dedup] rejected duplicate in mempool scope");
            return Ok(ResponseCheckTx::rejected(self.reject_code(), DUPLICATE_LOG));
        }

        let response = self.app.check_tx(tx)?;
        if response.is_ok() {
            self.index.record(Scope::Mempool, &key);
        }
        Ok(response)
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        let key = self.index.extract(tx);
        if self.index.lookup(Scope::Block, &key)? {
            debug!("[dedup] rejected duplicate in block scope");
            return Ok(ResponseDeliverTx::rejected(self.reject_code(), DUPLICATE_LOG));
        }

        let response = self.app.deliver_tx(tx)?;
        if response.is_ok() {
            self.index.record(Scope::Block, &key);
        }
        Ok(response)
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.app.end_block(request)
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        // Inner layers persist their own state first. A crash before the
        // flush below keeps their height but loses this block's records.
        let response = self.app.commit()?;

        let written = self.index.flush(Scope::Block).map_err(|e| {
            error!("[dedup] flush after successful commit failed: {}", e);
            e
        })?;
        self.index.reset(Scope::Mempool);

        info!("[dedup] committed {} bucket records", written);
        Ok(response)
    }
}
