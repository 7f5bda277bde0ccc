//! Transaction key extraction.
//!
//! Extraction is total: every transaction maps to a non-empty key. An empty
//! extractor result is replaced by [`NULL_KEY`] so "no key" is never a
//! zero-length record.

/// Sentinel key used when an extractor yields no bytes.
pub const NULL_KEY: &[u8] = b"NULL";

/// Maps a raw transaction to its de-duplication key.
pub trait KeyExtractor: Send + Sync {
    /// Raw key bytes. May be empty; [`extract_key`] normalizes it.
    fn key_of(&self, tx: &[u8]) -> Vec<u8>;
}

/// The transaction itself is the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityExtractor;

impl KeyExtractor for IdentityExtractor {
    fn key_of(&self, tx: &[u8]) -> Vec<u8> {
        tx.to_vec()
    }
}

/// Key is everything before the first `separator` byte, or the whole
/// transaction when the separator is absent.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedExtractor {
    pub separator: u8,
}

impl DelimitedExtractor {
    pub fn new(separator: u8) -> Self {
        Self { separator }
    }
}

impl KeyExtractor for DelimitedExtractor {
    fn key_of(&self, tx: &[u8]) -> Vec<u8> {
        match tx.iter().position(|b| *b == self.separator) {
            Some(pos) => tx[..pos].to_vec(),
            None => tx.to_vec(),
        }
    }
}

impl<F> KeyExtractor for F
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    fn key_of(&self, tx: &[u8]) -> Vec<u8> {
        self(tx)
    }
}

/// Extract and normalize the key of `tx`.
pub fn extract_key(extractor: &dyn KeyExtractor, tx: &[u8]) -> Vec<u8> {
    let key = extractor.key_of(tx);
    if key.is_empty() {
        NULL_KEY.to_vec()
    } else {
        key
    }
}
