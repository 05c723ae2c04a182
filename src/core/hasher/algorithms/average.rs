//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to 8x8
//! 2. Converting to grayscale
//! 3. Computing the average brightness
//! 4. For each pixel: if brighter than average, set bit to 1, else 0
//!
//! The hashing itself is delegated to the image_hasher crate.

use super::super::traits::{HashAlgorithm, ImageHash};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

/// Side length of the hash grid; 8x8 gives 64 bits
const HASH_SIDE: u32 = 8;

/// Average Hash (aHash) producing a fixed 64-bit value
pub struct AverageHasher {
    hasher: image_hasher::Hasher,
}

impl AverageHasher {
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIDE, HASH_SIDE)
            .hash_alg(HashAlg::Mean)
            .to_hasher();

        Self { hasher }
    }
}

impl Default for AverageHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAlgorithm for AverageHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHash, HashError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::ComputationFailed("image has no pixels".to_string()));
        }
        let hash = self.hasher.hash_image(image);
        ImageHash::from_bytes(hash.as_bytes())
    }
}
