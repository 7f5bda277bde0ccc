//! Minimal block codec: structure-to-bytes encoding plus a BLAKE3 hash.
//!
//! Applications that compute their own commit hash (and therefore sit under
//! a [`HashMemoryLayer`](crate::layers::HashMemoryLayer)) can chain blocks
//! with it.

use super::errors::{LayerError, LayerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A committed block as seen by an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: String,
    pub timestamp: String,
    pub genesis: Vec<u8>,
    pub txs: Vec<Vec<u8>>,
    pub prev_hash: Vec<u8>,
}

impl Block {
    /// Canonical bincode encoding.
    pub fn encode(&self) -> LayerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LayerError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> LayerResult<Self> {
        bincode::deserialize(bytes).map_err(|e| LayerError::Serialization(e.to_string()))
    }

    /// Encode and hash in one step.
    pub fn hash(&self) -> LayerResult<[u8; 32]> {
        Ok(hash_block(&self.encode()?))
    }
}

/// BLAKE3 of an encoded block.
pub fn hash_block(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let txs: Vec<String> = self
            .txs
            .iter()
            .map(|tx| format!("{:?}", String::from_utf8_lossy(tx)))
            .collect();
        write!(
            f,
            "Block[{} '{}' {:?} [{}] #{}]",
            self.index,
            self.timestamp,
            String::from_utf8_lossy(&self.genesis),
            txs.join(" "),
            hex::encode(&self.prev_hash)
        )
    }
}
