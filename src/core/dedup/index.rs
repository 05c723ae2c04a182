//! The hash index: signature to canonical file.

use crate::core::hasher::ImageHash;
use crate::core::scanner::MediaKind;
use std::collections::HashMap;
use std::fmt;

/// Signature under which a file is registered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// Perceptual hash of a photo
    Image(ImageHash),
    /// File name of a video or audio file
    Media(String),
}

impl IndexKey {
    /// Key for a file, `None` for a photo whose hash could not be computed
    pub fn for_file(kind: MediaKind, file_name: &str, hash: Option<ImageHash>) -> Option<Self> {
        if kind.is_hashable() {
            hash.map(IndexKey::Image)
        } else {
            Some(IndexKey::Media(file_name.to_string()))
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Image(hash) => write!(f, "{}", hash),
            IndexKey::Media(name) => write!(f, "video_{}", name),
        }
    }
}

/// Append-only map from signature to the first file seen with it.
///
/// Built fresh for every run.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    entries: HashMap<IndexKey, String>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as canonical for `key` unless the key is taken.
    ///
    /// Returns `true` when the entry was added.
    pub fn insert(&mut self, key: IndexKey, name: &str) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(name.to_string());
                true
            }
        }
    }

    /// Canonical file registered for `key`
    pub fn canonical(&self, key: &IndexKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
