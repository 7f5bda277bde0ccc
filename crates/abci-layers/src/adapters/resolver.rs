//! # Store-Backed Metadata Resolver
//!
//! Serves media metadata out of a [`KeyValueStore`]. Each object is one
//! JSON record under `media/<object-id>`:
//!
//! ```text
//! {"pw":"<hex sha256(password)>","meta":{"h":"video","m":["video/webm"]}}
//! ```
//!
//! A resolve succeeds only when the password hashes to the stored digest.

use crate::domain::media::MediaMeta;
use crate::ports::outbound::{KeyValueStore, MetadataResolver, ResolveError};
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};

/// Key prefix of media records.
pub const MEDIA_KEY_PREFIX: &[u8] = b"media/";

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
struct MediaRecord {
    #[serde_as(as = "Hex")]
    pw: Vec<u8>,
    meta: MediaMeta,
}

fn media_key(object_id: &str) -> Vec<u8> {
    let mut key = MEDIA_KEY_PREFIX.to_vec();
    key.extend_from_slice(object_id.as_bytes());
    key
}

fn password_digest(password: &[u8]) -> Vec<u8> {
    Sha256::digest(password).to_vec()
}

fn resolve_error(object_id: &str, reason: impl std::fmt::Display) -> ResolveError {
    ResolveError {
        message: format!("object {} {}", object_id, reason),
    }
}

/// [`MetadataResolver`] reading password-protected records from a store.
pub struct KvMetadataResolver<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvMetadataResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Store `meta` for `object_id`, readable with `password`.
    pub fn publish(
        &self,
        object_id: &str,
        password: &[u8],
        meta: &MediaMeta,
    ) -> Result<(), ResolveError> {
        let record = MediaRecord {
            pw: password_digest(password),
            meta: meta.clone(),
        };
        let bytes = serde_json::to_vec(&record).map_err(|e| resolve_error(object_id, e))?;
        self.store
            .set(&media_key(object_id), &bytes)
            .map_err(|e| resolve_error(object_id, e))
    }
}

impl<S: KeyValueStore> MetadataResolver for KvMetadataResolver<S> {
    fn resolve(&self, object_id: &str, password: &[u8]) -> Result<MediaMeta, ResolveError> {
        let bytes = self
            .store
            .get(&media_key(object_id))
            .map_err(|e| resolve_error(object_id, e))?
            .ok_or_else(|| resolve_error(object_id, "not found"))?;

        let record: MediaRecord = serde_json::from_slice(&bytes).map_err(|e| {
            resolve_error(object_id, format!("has corrupt metadata: {}", e))
        })?;

        if record.pw != password_digest(password) {
            return Err(resolve_error(object_id, "rejected the password"));
        }
        Ok(record.meta)
    }
}
