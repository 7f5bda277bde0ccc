//! # Block Replay
//!
//! Feeds a text stream of transactions through an [`Application`].
//!
//! ```text
//! a=1          ─┐
//! b=2           ├─ block h
//! ---          ─┘  (closes the block, even when empty)
//! c=3          ─┐
//! <EOF>        ─┘  block h+1 (only if it has transactions)
//! ```
//!
//! Blank lines are ignored. Every transaction goes through `check_tx` and
//! then `deliver_tx`; each block ends with `end_block(h)` and `commit`.

use abci_layers::{Application, Height, LayerError, RequestEndBlock};
use std::io::BufRead;
use thiserror::Error;
use tracing::{debug, info};

/// Line that closes the current block.
pub const BLOCK_DELIMITER: &str = "---";

/// Replay failure. Both variants are fatal.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Reading input failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Block {height} failed: {source}")]
    Layer {
        height: Height,
        #[source]
        source: LayerError,
    },
}

/// Totals of one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub blocks: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Commit data of the last block, empty when no block was closed.
    pub last_hash: Vec<u8>,
}

/// Drives blocks into an application starting at a given height.
pub struct Replayer<'a, A: Application + ?Sized> {
    app: &'a A,
    next_height: Height,
    summary: ReplaySummary,
}

impl<'a, A: Application + ?Sized> Replayer<'a, A> {
    pub fn new(app: &'a A, next_height: Height) -> Self {
        Self {
            app,
            next_height,
            summary: ReplaySummary::default(),
        }
    }

    pub fn next_height(&self) -> Height {
        self.next_height
    }

    /// Replay every block in `input`.
    pub fn replay<R: BufRead>(mut self, input: R) -> Result<ReplaySummary, ReplayError> {
        let mut pending = 0usize;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == BLOCK_DELIMITER {
                self.close_block()?;
                pending = 0;
                continue;
            }
            self.submit(line.as_bytes())?;
            pending += 1;
        }
        if pending > 0 {
            self.close_block()?;
        }
        Ok(self.summary)
    }

    fn submit(&mut self, tx: &[u8]) -> Result<(), ReplayError> {
        let height = self.next_height;
        let layer_err = |source| ReplayError::Layer { height, source };

        let checked = self.app.check_tx(tx).map_err(layer_err)?;
        if !checked.is_ok() {
            debug!("[replay] check_tx code {} ({})", checked.code, checked.log);
        }

        let delivered = self.app.deliver_tx(tx).map_err(layer_err)?;
        if delivered.is_ok() {
            self.summary.accepted += 1;
        } else {
            debug!("[replay] deliver_tx code {} ({})", delivered.code, delivered.log);
            self.summary.rejected += 1;
        }
        Ok(())
    }

    fn close_block(&mut self) -> Result<(), ReplayError> {
        let height = self.next_height;
        let layer_err = |source| ReplayError::Layer { height, source };

        self.app
            .end_block(&RequestEndBlock { height })
            .map_err(layer_err)?;
        let commit = self.app.commit().map_err(layer_err)?;
        info!("[replay] block {} committed, hash {}", height, hex::encode(&commit.data));

        self.summary.blocks += 1;
        self.summary.last_hash = commit.data;
        self.next_height += 1;
        Ok(())
    }
}
