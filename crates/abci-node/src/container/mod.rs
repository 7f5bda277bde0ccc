//! # Layer Container
//!
//! Node configuration and assembly of the store plus layer stack.

pub mod config;
pub mod stack;

pub use config::{ConfigError, HashMode, NodeConfig, StorageBackend};
pub use stack::{build_stack, open_store, LayerContainer, NodeError, SharedStore};
