//! # Dedup Module
//!
//! First-seen-wins duplicate detection.
//!
//! ## Protocol
//! 1. **Classify** every file in a fixed order. A file whose name looks like a
//!    copy (`photo - Copy.jpg`, `photo (2).jpg`) is a duplicate outright;
//!    otherwise its key is looked up in the [`HashIndex`] and the first file
//!    seen with a key becomes the canonical copy.
//! 2. **Verify** once every file is classified. A duplicate whose comparison
//!    key has no canonical copy in the index is downgraded to unresolved and
//!    goes to manual review instead of being removed.
//!
//! Photos are keyed by their perceptual hash, videos and audio by
//! `video_` + file name.

mod detector;
mod index;

pub use detector::{
    ConfirmedDuplicate, DuplicateDetector, DuplicateVerdict, FlaggedDuplicate, Verification,
};
pub use index::{HashIndex, IndexKey};

use regex::Regex;
use std::sync::LazyLock;

use crate::core::scanner::split_name;

static COPY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)(?: - Copy| \(\d+\))$").expect("copy suffix pattern is valid")
});

/// True when the stem ends in ` - Copy` or ` (<n>)`
pub fn is_duplicate_name(file_name: &str) -> bool {
    let (stem, _) = split_name(file_name);
    COPY_SUFFIX
        .captures(stem)
        .is_some_and(|c| !c[1].is_empty())
}

/// Name of the file a copy was made from: copy suffixes stripped from the
/// stem, extension re-appended
pub fn original_name(file_name: &str) -> String {
    let (mut stem, extension) = split_name(file_name);
    while let Some(captures) = COPY_SUFFIX.captures(stem) {
        let inner = captures.get(1).map_or("", |m| m.as_str());
        if inner.is_empty() {
            break;
        }
        stem = &stem[..inner.len()];
    }
    crate::core::naming::join_extension(stem, extension)
}
