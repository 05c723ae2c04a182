//! Trait definitions for perceptual hashing.

use super::fast_decode::FastDecoder;
use crate::error::HashError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A 64-bit perceptual hash.
///
/// Two images are treated as the same picture when their hashes are equal;
/// there is no distance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageHash(u64);

impl ImageHash {
    /// Wrap a raw hash value
    pub fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Build from the big-endian bytes produced by a hasher
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let array: [u8; 8] = bytes.try_into().map_err(|_| {
            HashError::ComputationFailed(format!("expected 8 hash bytes, got {}", bytes.len()))
        })?;
        Ok(Self(u64::from_be_bytes(array)))
    }

    /// Raw hash value
    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Hash as a 16-digit lower-case hexadecimal string
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl std::fmt::Display for ImageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from an already-loaded image
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHash, HashError>;

    /// Compute a hash directly from a file path
    fn hash_file(&self, path: &Path) -> Result<ImageHash, HashError> {
        let image = FastDecoder::decode(path)?;
        self.hash_image(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_zero_padded() {
        assert_eq!(ImageHash::new(0xff).to_hex(), "00000000000000ff");
        assert_eq!(ImageHash::new(u64::MAX).to_string(), "ffffffffffffffff");
    }

    #[test]
    fn from_bytes_is_big_endian() {
        let hash = ImageHash::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 1]).unwrap();
        assert_eq!(hash.to_hex(), "deadbeef00000001");
    }

    #[test]
    fn from_bytes_rejects_wrong_width() {
        assert!(ImageHash::from_bytes(&[1, 2, 3]).is_err());
    }
}
