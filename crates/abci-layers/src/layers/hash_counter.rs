//! # Hash-Counter Layer
//!
//! Computes the app hash independently of the wrapped application and
//! answers `info` with the last committed `(height, hash)`.
//!
//! ## Lifecycle
//!
//! ```text
//! start ──→ load (hash, height) from `info`
//! init_chain ──→ hash = H(bcseed ‖ app_state), height = 0
//! deliver_tx ──→ accepted tx bytes into the digest
//! end_block ──→ pending height
//! commit ──→ wrapped commit, then "{height}" into digest, persist, return hash
//! ```
//!
//! The wrapped application's own commit data is discarded.

use crate::domain::accumulator::{HashAccumulator, GENESIS_SEED_KEY};
use crate::domain::config::HashConfig;
use crate::domain::errors::LayerResult;
use crate::domain::types::{
    RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain,
};
use crate::ports::inbound::Application;
use crate::ports::outbound::KeyValueStore;
use parking_lot::Mutex;
use tracing::info;

/// Application layer maintaining a chained, persisted app hash.
pub struct HashCounterLayer<A: Application, S: KeyValueStore + Clone> {
    app: A,
    store: S,
    accumulator: Mutex<HashAccumulator<S>>,
}

impl<A: Application, S: KeyValueStore + Clone> HashCounterLayer<A, S> {
    pub fn new(app: A, store: S, config: HashConfig) -> LayerResult<Self> {
        let accumulator = HashAccumulator::new(store.clone(), config)?;
        Ok(Self {
            app,
            store,
            accumulator: Mutex::new(accumulator),
        })
    }

    pub fn inner(&self) -> &A {
        &self.app
    }

    /// Durably store the genesis seed read by `init_chain`.
    pub fn store_genesis_seed(&self, seed: &[u8]) -> LayerResult<()> {
        let mut batch = self.store.new_batch();
        batch.set(GENESIS_SEED_KEY, seed);
        self.store.write_sync(batch)?;
        Ok(())
    }
}

impl<A: Application, S: KeyValueStore + Clone> Application for HashCounterLayer<A, S> {
    fn start(&self) -> LayerResult<()> {
        self.accumulator.lock().start()?;
        self.app.start()
    }

    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo> {
        let mut response = self.app.info(request)?;
        let (height, hash) = self.accumulator.lock().info();
        response.last_block_height = height;
        response.last_block_app_hash = hash;
        Ok(response)
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        let seed = self.store.get(GENESIS_SEED_KEY)?;
        self.accumulator
            .lock()
            .init_chain(seed.as_deref(), &request.app_state_bytes);
        self.app.init_chain(request)
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        self.app.check_tx(tx)
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        let response = self.app.deliver_tx(tx)?;
        if response.is_ok() {
            self.accumulator.lock().on_delivered_tx(tx);
        }
        Ok(response)
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.accumulator.lock().on_end_block(request.height);
        self.app.end_block(request)
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        self.app.commit()?;

        let mut accumulator = self.accumulator.lock();
        let hash = accumulator.on_commit()?;
        let (height, _) = accumulator.info();
        info!("[app-hash] committed height {} hash {}", height, hex::encode(&hash));

        Ok(ResponseCommit { data: hash })
    }
}
