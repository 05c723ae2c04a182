//! # Scanner Module
//!
//! Lists the media files of a flat source folder.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - HEIC (.heic, .heif) - iPhone photos
//! - PNG (.png) - hashed like any other still image
//! - MOV, MP4 - videos, dated through the container's creation time
//! - MP3 - audio, handled like video
//!
//! Subdirectories and hidden files are never listed.

mod filter;
mod walker;

pub use filter::MediaFilter;
pub use walker::{FlatScanner, ScanConfig};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Container format of a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Jpeg,
    Heic,
    Mov,
    Mp4,
    Mp3,
    Other,
}

impl MediaKind {
    /// Detect the kind from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => MediaKind::Jpeg,
            "heic" | "heif" => MediaKind::Heic,
            "mov" => MediaKind::Mov,
            "mp4" => MediaKind::Mp4,
            "mp3" => MediaKind::Mp3,
            _ => MediaKind::Other,
        }
    }

    /// Detect the kind from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Other)
    }

    /// Whether a perceptual hash can be computed for this kind.
    ///
    /// Video and audio are deduplicated by file name only.
    pub fn is_hashable(&self) -> bool {
        !matches!(self, MediaKind::Mov | MediaKind::Mp4 | MediaKind::Mp3)
    }

    /// Whether capture metadata lives in the container rather than in EXIF
    pub fn is_timed_media(&self) -> bool {
        !self.is_hashable()
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MediaKind::Jpeg => "jpeg",
            MediaKind::Heic => "heic",
            MediaKind::Mov => "mov",
            MediaKind::Mp4 => "mp4",
            MediaKind::Mp3 => "mp3",
            MediaKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// A media file found in the source folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File name including the extension
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Container format
    pub kind: MediaKind,
}

impl SourceFile {
    /// File name without the extension
    pub fn stem(&self) -> &str {
        split_name(&self.name).0
    }

    /// Original extension, case preserved
    pub fn extension(&self) -> &str {
        split_name(&self.name).1
    }
}

/// Split a file name into stem and extension (without the dot).
///
/// A leading dot does not start an extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Media files, sorted by name
    pub files: Vec<SourceFile>,
    /// Files that were not listed because they are not media
    pub ignored: Vec<PathBuf>,
    /// Non-fatal errors
    pub errors: Vec<ScanError>,
}

/// Trait for source listers
///
/// Implement this trait to feed the pipeline from something other than a
/// directory (e.g., in tests).
pub trait MediaScanner: Send + Sync {
    /// List the media files directly inside `root`
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// List with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_from_extension_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Jpeg);
        assert_eq!(MediaKind::from_extension("JPEG"), MediaKind::Jpeg);
        assert_eq!(MediaKind::from_extension("HEIC"), MediaKind::Heic);
        assert_eq!(MediaKind::from_extension("Mov"), MediaKind::Mov);
        assert_eq!(MediaKind::from_extension("png"), MediaKind::Other);
    }

    #[test]
    fn video_and_audio_are_not_hashable() {
        assert!(!MediaKind::Mov.is_hashable());
        assert!(!MediaKind::Mp4.is_hashable());
        assert!(!MediaKind::Mp3.is_hashable());
        assert!(MediaKind::Jpeg.is_hashable());
        assert!(MediaKind::Heic.is_hashable());
        assert!(MediaKind::Other.is_hashable());
    }

    #[test]
    fn split_name_keeps_extension_case() {
        assert_eq!(split_name("IMG_0001.JPG"), ("IMG_0001", "JPG"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_name("noext"), ("noext", ""));
        assert_eq!(split_name(".hidden"), (".hidden", ""));
    }
}
