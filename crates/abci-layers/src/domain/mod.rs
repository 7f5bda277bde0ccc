pub mod accumulator;
pub mod block;
pub mod bucket;
pub mod config;
pub mod dedup_index;
pub mod errors;
pub mod extractor;
pub mod media;
pub mod types;

pub use accumulator::*;
pub use block::*;
pub use bucket::*;
pub use config::*;
pub use dedup_index::*;
pub use errors::*;
pub use extractor::*;
pub use media::*;
pub use types::*;
