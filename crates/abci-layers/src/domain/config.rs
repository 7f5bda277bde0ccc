//! # Layer Configuration
//!
//! The defaults are the protocol values. Changing them changes bucket labels
//! or the app hash, so every replica of a chain must agree on them.

use super::errors::ConfigError;

/// Default number of hash bits kept for a bucket label (2^24 buckets).
pub const DEFAULT_BUCKET_BITS: u32 = 24;

/// Response code returned for a detected duplicate.
pub const DEFAULT_REJECT_CODE: u32 = 1;

/// Length of the truncated SHA-256 app hash.
pub const DEFAULT_TRUNCATED_LEN: usize = 20;

/// De-duplication layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupConfig {
    /// Low bits of the FNV-1a hash used as bucket number.
    ///
    /// Caps the persistent index at `2^bucket_bits` records.
    pub bucket_bits: u32,

    /// Code returned when a transaction is rejected as duplicate.
    pub reject_code: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            bucket_bits: DEFAULT_BUCKET_BITS,
            reject_code: DEFAULT_REJECT_CODE,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_bits == 0 || self.bucket_bits > 32 {
            return Err(ConfigError::BucketBits {
                bits: self.bucket_bits,
            });
        }
        if self.reject_code == 0 {
            return Err(ConfigError::ZeroRejectCode);
        }
        Ok(())
    }

    /// Bucket mask applied to the 32-bit hash.
    pub fn bucket_mask(&self) -> u32 {
        if self.bucket_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bucket_bits) - 1
        }
    }

    /// Number of hex digits in a bucket label.
    pub fn label_width(&self) -> usize {
        self.bucket_bits.div_ceil(4) as usize
    }
}

/// Hash-counter layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashConfig {
    /// Bytes of SHA-256 output kept as app hash.
    pub truncated_len: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            truncated_len: DEFAULT_TRUNCATED_LEN,
        }
    }
}

impl HashConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.truncated_len == 0 || self.truncated_len > 32 {
            return Err(ConfigError::TruncatedLength {
                len: self.truncated_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dedup_config() {
        let config = DedupConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_mask(), 0x00FF_FFFF);
        assert_eq!(config.label_width(), 6);
    }

    #[test]
    fn test_bucket_bits_bounds() {
        let config = DedupConfig {
            bucket_bits: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BucketBits { bits: 0 }));

        let config = DedupConfig {
            bucket_bits: 33,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DedupConfig {
            bucket_bits: 32,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_mask(), u32::MAX);
        assert_eq!(config.label_width(), 8);
    }

    #[test]
    fn test_odd_bucket_bits_round_label_up() {
        let config = DedupConfig {
            bucket_bits: 10,
            ..Default::default()
        };
        assert_eq!(config.bucket_mask(), 0x3FF);
        assert_eq!(config.label_width(), 3);
    }

    #[test]
    fn test_zero_reject_code_rejected() {
        let config = DedupConfig {
            reject_code: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRejectCode));
    }

    #[test]
    fn test_hash_config_bounds() {
        assert!(HashConfig::default().validate().is_ok());
        assert!(HashConfig { truncated_len: 0 }.validate().is_err());
        assert!(HashConfig { truncated_len: 33 }.validate().is_err());
        assert!(HashConfig { truncated_len: 32 }.validate().is_ok());
    }
}
