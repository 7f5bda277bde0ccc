//! # Inbound Port
//!
//! The lifecycle contract shared by applications and every layer.
//!
//! ## Call Streams
//!
//! Callers drive two independent, internally ordered streams:
//!
//! | Stream | Methods |
//! |--------|---------|
//! | Check | `check_tx` |
//! | Consensus | `init_chain`, `deliver_tx`, `end_block`, `commit`, `info` |
//!
//! Methods take `&self` so both streams may run on different threads. A
//! layer keeps state touched by only one stream behind its own lock.
//!
//! There are no default methods: a layer forwards or intercepts every call
//! explicitly.

use crate::domain::errors::LayerResult;
use crate::domain::types::{
    RequestEndBlock, RequestInfo, RequestInitChain, ResponseCheckTx, ResponseCommit,
    ResponseDeliverTx, ResponseEndBlock, ResponseInfo, ResponseInitChain,
};

/// A deterministic state-machine application (or a layer wrapping one).
pub trait Application: Send + Sync {
    /// Load persisted state before the first call of either stream.
    fn start(&self) -> LayerResult<()>;

    /// Report the last committed height and app hash.
    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo>;

    /// Genesis.
    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain>;

    /// Speculative mempool admission.
    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx>;

    /// Binding execution inside the current block.
    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx>;

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock>;

    /// Finalize the block and return its app hash.
    fn commit(&self) -> LayerResult<ResponseCommit>;
}

impl<T: Application + ?Sized> Application for Box<T> {
    fn start(&self) -> LayerResult<()> {
        (**self).start()
    }

    fn info(&self, request: &RequestInfo) -> LayerResult<ResponseInfo> {
        (**self).info(request)
    }

    fn init_chain(&self, request: &RequestInitChain) -> LayerResult<ResponseInitChain> {
        (**self).init_chain(request)
    }

    fn check_tx(&self, tx: &[u8]) -> LayerResult<ResponseCheckTx> {
        (**self).check_tx(tx)
    }

    fn deliver_tx(&self, tx: &[u8]) -> LayerResult<ResponseDeliverTx> {
        (**self).deliver_tx(tx)
    }

    fn end_block(&self, request: &RequestEndBlock) -> LayerResult<ResponseEndBlock> {
        (**self).end_block(request)
    }

    fn commit(&self) -> LayerResult<ResponseCommit> {
        (**self).commit()
    }
}
