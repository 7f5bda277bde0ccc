//! Bucket labels for the de-duplication index.
//!
//! A key is hashed with 32-bit FNV-1a and masked to the configured number of
//! bits, so the index never holds more than `2^bits` records no matter how
//! many transactions pass through. Occupancy is confirmed by comparing the
//! full key, so a collision can only cost a missed duplicate.

use super::config::DedupConfig;

/// Prefix shared by every bucket record.
pub const BUCKET_PREFIX: &[u8] = b"dedup";

/// Inclusive start of the bucket key range.
pub const BUCKET_RANGE_START: &[u8] = b"dedup\x00";

/// Exclusive end of the bucket key range.
pub const BUCKET_RANGE_END: &[u8] = b"dedup\xff";

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
#[inline]
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h = FNV32_OFFSET_BASIS;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(FNV32_PRIME);
    }
    h
}

/// Store key of the bucket that `key` falls into, e.g. `dedupF37ED7`.
pub fn bucket_label(key: &[u8], config: &DedupConfig) -> Vec<u8> {
    let bucket = fnv1a32(key) & config.bucket_mask();
    let mut label = BUCKET_PREFIX.to_vec();
    label.extend_from_slice(format!("{:0width$X}", bucket, width = config.label_width()).as_bytes());
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a32_reference_vectors() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_label_format() {
        let label = bucket_label(b"foobar", &DedupConfig::default());
        assert_eq!(label, b"dedup9CF968".to_vec());
    }

    #[test]
    fn test_label_is_fixed_width() {
        let config = DedupConfig::default();
        for i in 0..500u32 {
            let label = bucket_label(&i.to_le_bytes(), &config);
            assert_eq!(label.len(), BUCKET_PREFIX.len() + 6);
        }
    }

    #[test]
    fn test_labels_fall_inside_scan_range() {
        let config = DedupConfig::default();
        for i in 0..500u32 {
            let label = bucket_label(format!("tx-{i}").as_bytes(), &config);
            assert!(label.as_slice() >= BUCKET_RANGE_START);
            assert!(label.as_slice() < BUCKET_RANGE_END);
        }
    }

    #[test]
    fn test_narrow_buckets_are_bounded() {
        let config = DedupConfig {
            bucket_bits: 4,
            ..Default::default()
        };
        let labels: std::collections::HashSet<_> = (0..1000u32)
            .map(|i| bucket_label(&i.to_be_bytes(), &config))
            .collect();
        assert!(labels.len() <= 16);
    }
}
