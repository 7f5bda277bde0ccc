//! # ABCI Layers
//!
//! Composable middleware between consensus and a deterministic
//! state-machine application.
//!
//! ## Layers
//!
//! | Layer | Purpose |
//! |-------|---------|
//! | [`DedupLayer`] | Rejects already-seen transactions (bounded index, no false positives) |
//! | [`HashCounterLayer`] | Chained, persisted app hash over accepted transactions |
//! | [`HashMemoryLayer`] | Surfaces the wrapped app's own commit hash via `info` |
//! | [`ValidationLayer`] | Validates media transactions against external metadata |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement |
//! |----|-----------|-------------|
//! | 1 | No false-positive duplicates | `DedupBucketIndex::lookup()` full-key compare |
//! | 2 | Overlays never outlive their commit | `DedupLayer::commit()` flush + reset |
//! | 3 | Persisted hash = last successful commit | `HashAccumulator::on_commit()` persists before advancing |
//! | 4 | Hash depends only on replicated input | prev hash, accepted tx bytes, height |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - bucket index, accumulator, codecs, config, errors
//! - `ports/` - `Application` (inbound), `KeyValueStore` / `MetadataResolver` (outbound)
//! - `adapters/` - in-memory and file-backed stores, store-backed resolver, test doubles
//! - `layers/` - the application layers
//!
//! ## Usage
//!
//! ```ignore
//! use abci_layers::{DedupConfig, DedupLayer, HashConfig, HashCounterLayer, InMemoryKVStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryKVStore::new());
//! let app = HashCounterLayer::new(my_app, store.clone(), HashConfig::default())?;
//! let app = DedupLayer::new(app, store, DedupConfig::default())?;
//! app.start()?;
//! ```

pub mod adapters;
pub mod domain;
pub mod layers;
pub mod ports;

pub use adapters::{FileBackedKVStore, InMemoryKVStore};
pub use domain::*;
pub use layers::*;
pub use ports::*;
