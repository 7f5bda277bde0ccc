//! # Hash-Memory Layer
//!
//! For transient, in-memory applications whose commit already returns a
//! correct app hash: remembers the `(height, hash)` of each commit and
//! reports it through `info`. No digest work of its own.

use crate::domain::errors::LayerResult;
use crate::domain::types::{
    Height, RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain,
};
use crate::ports::inbound::Application;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct CommitState {
    last_hash: Vec<u8>,
    last_height: Height,
    pending_height: Height,
}

/// Application layer surfacing the wrapped commit hash through `info`.
pub struct HashMemoryLayer<A: Application> {
    app: A,
    state: Mutex<CommitState>,
}

impl<A: Application> HashMemoryLayer<A> {
    pub fn new(app: A) -> Self {
        Self {
            app,
            state: Mutex::new(CommitState::default()),
        }
    }

    pub fn inner(&self) -> &A {
        &self.app
    }
}

impl<A: Application> Application for HashMemoryLayer<A> {
    fn start(&self) -> LayerResult<()> {
        self.app.start()
    }

    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo> {
        let mut response = self.app.info(request)?;
        let state = self.state.lock();
        response.last_block_height = state.last_height;
        response.last_block_app_hash = state.last_hash.clone();
        Ok(response)
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        self.app.init_chain(request)
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        self.app.check_tx(tx)
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        self.app.deliver_tx(tx)
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        self.state.lock().pending_height = request.height;
        self.app.end_block(request)
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        let response = self.app.commit()?;

        let mut state = self.state.lock();
        state.last_hash = response.data.clone();
        state.last_height = state.pending_height;
        Ok(ResponseCommit {
            data: state.last_hash.clone(),
        })
    }
}
