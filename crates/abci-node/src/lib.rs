//! # ABCI Node
//!
//! Reference host for the `abci-layers` stack.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Open the store and assemble the layer stack
//! 3. `start`, then `init_chain` when nothing was committed yet
//! 4. Replay blocks from stdin (`---` separates blocks)
//! 5. Log the final `info`
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and stack assembly
//! - `adapters/` - storage backends (RocksDB behind the `rocksdb` feature)
//! - `app` - the key/value reference application
//! - `replay` - block replay driver

pub mod adapters;
pub mod app;
pub mod container;
pub mod replay;

pub use app::{KvStoreApp, CODE_MALFORMED};
pub use container::{LayerContainer, NodeConfig, NodeError};
pub use replay::{ReplayError, ReplaySummary, Replayer};

use abci_layers::{Application, LayerResult, RequestInfo, RequestInitChain, ResponseInfo};
use tracing::info;

/// Start `app` and run `init_chain` if no block was committed yet.
///
/// Returns the `info` the application reports after startup.
pub fn boot(app: &dyn Application, config: &NodeConfig) -> LayerResult<ResponseInfo> {
    app.start()?;

    let request = RequestInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let mut status = app.info(&request)?;
    if status.last_block_height == 0 {
        info!("[node] fresh chain '{}', running init_chain", config.chain_id);
        app.init_chain(&RequestInitChain {
            chain_id: config.chain_id.clone(),
            app_state_bytes: Vec::new(),
        })?;
        status = app.info(&request)?;
    } else {
        info!(
            "[node] resuming after height {} ({})",
            status.last_block_height,
            hex::encode(&status.last_block_app_hash)
        );
    }
    Ok(status)
}
