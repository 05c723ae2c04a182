//! Flat directory listing using walkdir.

use super::{filter::MediaFilter, MediaScanner, ScanResult, SourceFile};
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, ScanEvent};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for the source scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to include hidden files
    pub include_hidden: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

/// Lists the files directly inside a folder (depth 1, no recursion)
pub struct FlatScanner {
    filter: MediaFilter,
}

impl FlatScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = MediaFilter::new().with_hidden(config.include_hidden);

        if let Some(extensions) = config.extensions {
            filter = filter.with_extensions(extensions);
        }

        Self { filter }
    }
}

impl MediaScanner for FlatScanner {
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &null_sender())
    }

    fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            path: root.to_path_buf(),
        }));

        let mut files = Vec::new();
        let mut ignored = Vec::new();
        let mut errors = Vec::new();

        for entry_result in WalkDir::new(root).min_depth(1).max_depth(1) {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path }
                    } else {
                        ScanError::ReadDirectory {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    errors.push(error);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            if !self.filter.should_include(path) {
                debug!(path = %path.display(), "not a media file, leaving it alone");
                ignored.push(path.to_path_buf());
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                ignored.push(path.to_path_buf());
                continue;
            };

            match fs::metadata(path) {
                Ok(metadata) => {
                    files.push(SourceFile {
                        path: path.to_path_buf(),
                        name: name.to_string(),
                        size: metadata.len(),
                        kind: self.filter.get_kind(path),
                    });
                    events.send(Event::Scan(ScanEvent::FileFound {
                        path: path.to_path_buf(),
                    }));
                }
                Err(e) => errors.push(ScanError::ReadDirectory {
                    path: path.to_path_buf(),
                    source: e,
                }),
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));

        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files.len(),
        }));

        Ok(ScanResult {
            files,
            ignored,
            errors,
        })
    }
}
