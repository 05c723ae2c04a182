//! Classification and verification against the hash index.

use super::index::{HashIndex, IndexKey};
use super::{is_duplicate_name, original_name};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of classifying one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateVerdict {
    /// First file seen with its signature; it is archived
    Unique,
    /// Redundant copy of another file
    Duplicate,
    /// Named like a copy, but no original could be found; needs a human
    Unresolved,
}

impl std::fmt::Display for DuplicateVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateVerdict::Unique => write!(f, "unique"),
            DuplicateVerdict::Duplicate => write!(f, "duplicate"),
            DuplicateVerdict::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A file classified as duplicate, waiting for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedDuplicate {
    pub name: String,
    pub key: IndexKey,
    /// Flagged by its name rather than by an index hit
    pub by_name: bool,
}

impl FlaggedDuplicate {
    /// Key the original must be registered under.
    ///
    /// Videos are keyed by name, so the original's name is rebuilt by
    /// stripping the copy suffix.
    pub fn comparison_key(&self) -> IndexKey {
        match &self.key {
            IndexKey::Image(hash) => IndexKey::Image(*hash),
            IndexKey::Media(name) => IndexKey::Media(original_name(name)),
        }
    }
}

/// A duplicate whose original was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedDuplicate {
    pub name: String,
    pub canonical: String,
}

/// Result of the verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub confirmed: Vec<ConfirmedDuplicate>,
    pub unresolved: Vec<String>,
}

/// Classifies files against an owned [`HashIndex`]
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    index: HashIndex,
    flagged: Vec<FlaggedDuplicate>,
}

impl DuplicateDetector {
    /// Detector over an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector over a pre-seeded index (e.g. files already archived)
    pub fn with_index(index: HashIndex) -> Self {
        Self {
            index,
            flagged: Vec::new(),
        }
    }

    pub fn index(&self) -> &HashIndex {
        &self.index
    }

    /// Files flagged so far and not yet verified
    pub fn flagged(&self) -> &[FlaggedDuplicate] {
        &self.flagged
    }

    /// Classify one file. Must be called in a fixed order: the first file
    /// seen with a key becomes canonical.
    pub fn classify(&mut self, file_name: &str, key: IndexKey) -> DuplicateVerdict {
        if is_duplicate_name(file_name) {
            debug!(file = file_name, "named like a copy");
            self.flagged.push(FlaggedDuplicate {
                name: file_name.to_string(),
                key,
                by_name: true,
            });
            return DuplicateVerdict::Duplicate;
        }

        if let Some(canonical) = self.index.canonical(&key) {
            debug!(file = file_name, canonical, %key, "signature already indexed");
            self.flagged.push(FlaggedDuplicate {
                name: file_name.to_string(),
                key,
                by_name: false,
            });
            return DuplicateVerdict::Duplicate;
        }

        self.index.insert(key, file_name);
        DuplicateVerdict::Unique
    }

    /// Confirm every flagged duplicate against the completed index.
    ///
    /// Drains the flagged list. A duplicate whose comparison key is present
    /// under another file is always confirmed.
    pub fn verify_duplicates(&mut self) -> Verification {
        let mut verification = Verification::default();

        for flagged in self.flagged.drain(..) {
            let key = flagged.comparison_key();
            match self.index.canonical(&key) {
                Some(canonical) if canonical != flagged.name => {
                    verification.confirmed.push(ConfirmedDuplicate {
                        name: flagged.name,
                        canonical: canonical.to_string(),
                    });
                }
                _ => {
                    warn!(file = %flagged.name, %key, "duplicate has no original; needs review");
                    verification.unresolved.push(flagged.name);
                }
            }
        }

        verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::ImageHash;

    fn image(bits: u64) -> IndexKey {
        IndexKey::Image(ImageHash::new(bits))
    }

    fn media(name: &str) -> IndexKey {
        IndexKey::Media(name.to_string())
    }

    #[test]
    fn new_hash_is_unique_then_duplicate() {
        let mut detector = DuplicateDetector::new();

        assert_eq!(detector.classify("a.jpg", image(1)), DuplicateVerdict::Unique);
        assert_eq!(detector.classify("b.jpg", image(1)), DuplicateVerdict::Duplicate);
        assert_eq!(detector.classify("c.jpg", image(2)), DuplicateVerdict::Unique);
        assert_eq!(detector.index().canonical(&image(1)), Some("a.jpg"));
    }

    #[test]
    fn copy_name_is_duplicate_regardless_of_hash() {
        let mut detector = DuplicateDetector::new();

        for bits in [0, 1, u64::MAX] {
            assert_eq!(
                detector.classify("IMG_0001 - Copy.jpg", image(bits)),
                DuplicateVerdict::Duplicate
            );
        }
        assert_eq!(
            detector.classify("IMG_0001 (3).jpg", image(99)),
            DuplicateVerdict::Duplicate
        );
        assert!(detector.index().is_empty());
    }

    #[test]
    fn verification_confirms_copy_with_indexed_hash() {
        let mut detector = DuplicateDetector::new();
        detector.classify("IMG_0001.jpg", image(5));
        detector.classify("IMG_0001 - Copy.jpg", image(5));

        let verification = detector.verify_duplicates();
        assert_eq!(
            verification.confirmed,
            vec![ConfirmedDuplicate {
                name: "IMG_0001 - Copy.jpg".to_string(),
                canonical: "IMG_0001.jpg".to_string(),
            }]
        );
        assert!(verification.unresolved.is_empty());
    }

    #[test]
    fn copy_without_original_becomes_unresolved() {
        let mut detector = DuplicateDetector::new();
        assert_eq!(
            detector.classify("IMG_0001 - Copy.jpg", image(8)),
            DuplicateVerdict::Duplicate
        );

        let verification = detector.verify_duplicates();
        assert!(verification.confirmed.is_empty());
        assert_eq!(verification.unresolved, vec!["IMG_0001 - Copy.jpg".to_string()]);
        assert!(detector.flagged().is_empty());
    }

    #[test]
    fn video_copy_is_matched_by_original_name() {
        let mut detector = DuplicateDetector::new();
        detector.classify("clip.mp4", media("clip.mp4"));
        detector.classify("clip (1).mp4", media("clip (1).mp4"));
        detector.classify("other - Copy.mov", media("other - Copy.mov"));

        let verification = detector.verify_duplicates();
        assert_eq!(verification.confirmed.len(), 1);
        assert_eq!(verification.confirmed[0].canonical, "clip.mp4");
        assert_eq!(verification.unresolved, vec!["other - Copy.mov".to_string()]);
    }

    #[test]
    fn verification_never_drops_hash_duplicates() {
        let mut detector = DuplicateDetector::new();
        let names = ["a.jpg", "b.jpg", "c (2).jpg", "d.jpg"];
        for name in names {
            detector.classify(name, image(3));
        }

        let verification = detector.verify_duplicates();
        let confirmed: Vec<_> = verification.confirmed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(confirmed, vec!["b.jpg", "c (2).jpg", "d.jpg"]);
        assert!(verification.unresolved.is_empty());
    }

    #[test]
    fn seeded_index_makes_reimports_duplicates() {
        let mut index = HashIndex::new();
        index.insert(image(10), "FR_20240501_102030.jpg");
        let mut detector = DuplicateDetector::with_index(index);

        assert_eq!(
            detector.classify("IMG_0001.jpg", image(10)),
            DuplicateVerdict::Duplicate
        );
        assert_eq!(detector.verify_duplicates().confirmed.len(), 1);
    }
}
