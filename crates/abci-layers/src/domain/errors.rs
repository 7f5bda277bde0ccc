//! # Domain Errors
//!
//! Error types for the layer stack.
//!
//! Duplicate detection and validation failures are NOT errors: they are
//! ordinary rejection responses. Everything here is fatal to the lifecycle
//! call that produced it, and the host is expected to stop the process.

use thiserror::Error;

/// Key-value store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O failure in the backing store.
    #[error("Store I/O error: {message}")]
    IOError { message: String },
}

/// Fatal failure surfaced by a layer or a wrapped application.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The persistent store failed.
    #[error("Store failure: {0}")]
    Store(#[from] KVStoreError),

    /// The persisted `info` record could not be decoded.
    #[error("Corrupt persisted app-hash state: {0}")]
    CorruptState(String),

    /// Encoding a structure to bytes failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Layer configuration rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The wrapped application reported a fatal failure.
    #[error("Application failure: {0}")]
    Application(String),
}

/// Configuration validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bucket bits must be in 1..=32, got {bits}")]
    BucketBits { bits: u32 },

    #[error("Rejection code must be non-zero")]
    ZeroRejectCode,

    #[error("Truncated digest length must be in 1..=32, got {len}")]
    TruncatedLength { len: usize },
}

/// Result alias for lifecycle calls.
pub type LayerResult<T> = Result<T, LayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_into_layer_error() {
        let err: LayerError = KVStoreError::IOError {
            message: "disk gone".into(),
        }
        .into();

        assert!(matches!(err, LayerError::Store(_)));
        assert_eq!(err.to_string(), "Store failure: Store I/O error: disk gone");
    }
}
