//! File filtering logic for the scanner.

use super::MediaKind;
use std::collections::HashSet;
use std::path::Path;

/// Decides which files of the source folder are media
pub struct MediaFilter {
    /// File extensions to include (lower-case)
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl MediaFilter {
    /// Create a new filter with the default media extensions
    pub fn new() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "heic", "heif", "png", "mov", "mp4", "mp3"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Check if a file should be listed
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with('.'))
        {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    /// Get the media kind for a path
    pub fn get_kind(&self, path: &Path) -> MediaKind {
        MediaKind::from_path(path)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}
