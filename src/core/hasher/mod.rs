//! # Hasher Module
//!
//! Computes the perceptual hash used for duplicate detection.
//!
//! A single algorithm is used: the 64-bit average hash (aHash). Two files are
//! duplicates when their hashes are equal; there is no similarity threshold.
//!
//! ## Example
//! ```rust,ignore
//! use media_archiver::core::hasher::{AverageHasher, HashAlgorithm};
//!
//! let hash = AverageHasher::new().hash_file(&path)?;
//! println!("{}", hash.to_hex());
//! ```

mod algorithms;
pub mod fast_decode;
mod traits;

pub use algorithms::AverageHasher;
pub use traits::{HashAlgorithm, ImageHash};
