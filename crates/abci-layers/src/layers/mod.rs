//! Application layers.
//!
//! Each layer owns the application it wraps and implements
//! [`Application`](crate::ports::Application) itself, so layers stack:
//!
//! ```text
//! DedupLayer<HashCounterLayer<App, S>, S>
//! ```

pub mod dedup;
pub mod hash_counter;
pub mod hash_memory;
pub mod validation;

pub use dedup::{DedupLayer, DUPLICATE_LOG};
pub use hash_counter::HashCounterLayer;
pub use hash_memory::HashMemoryLayer;
pub use validation::{ValidationEvent, ValidationLayer, Validator};
