//! # Lifecycle Messages
//!
//! Request and response types exchanged with a wrapped application.
//! A response code of [`CODE_OK`] means acceptance; anything else is a
//! rejection.

use std::fmt;

/// Acceptance code.
pub const CODE_OK: u32 = 0;

/// Generic rejection code used by the validation layer.
pub const CODE_FAILED: u32 = 1;

/// Raw transaction bytes.
pub type Tx = Vec<u8>;

/// Block height.
pub type Height = u64;

/// `Info` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// Version string of the caller.
    pub version: String,
}

/// `Info` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInfo {
    /// Free-form application data.
    pub data: String,
    /// Application version.
    pub version: String,
    /// Height of the last committed block.
    pub last_block_height: Height,
    /// App hash returned by the last commit.
    pub last_block_app_hash: Vec<u8>,
}

/// `InitChain` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInitChain {
    pub chain_id: String,
    /// Genesis application state.
    pub app_state_bytes: Vec<u8>,
}

/// `InitChain` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInitChain {}

/// `CheckTx` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCheckTx {
    pub code: u32,
    pub log: String,
}

impl ResponseCheckTx {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn rejected(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// `DeliverTx` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseDeliverTx {
    pub code: u32,
    pub log: String,
}

impl ResponseDeliverTx {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn rejected(code: u32, log: impl Into<String>) -> Self {
        Self {
            code,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// `EndBlock` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestEndBlock {
    pub height: Height,
}

/// `EndBlock` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEndBlock {}

/// `Commit` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCommit {
    /// Canonical app hash of the committed block.
    pub data: Vec<u8>,
}

/// Overlay scope of the de-duplication index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Keys admitted by `CheckTx` during the current round.
    Mempool,
    /// Keys accepted by `DeliverTx` in the current block.
    Block,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Mempool => write!(f, "mempool"),
            Scope::Block => write!(f, "block"),
        }
    }
}
