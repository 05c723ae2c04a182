//! # Error Module
//!
//! Error types for the media archiver.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file problems are not fatal** - only precondition failures abort a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Folder {path} is not reachable and could not be created: {source}")]
    BucketUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while listing the source folder
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur during image hashing
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Hash computation failed: {0}")]
    ComputationFailed(String),

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the metadata collaborators.
///
/// These never abort a run; the extractor turns them into "no metadata".
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to run {program} on {path}: {source}")]
    ProbeSpawn {
        program: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with an error for {path}: {stderr}")]
    ProbeFailed {
        program: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("Unreadable probe output for {path}: {reason}")]
    ProbeOutput { path: PathBuf, reason: String },
}

/// Errors from the reverse geocoder
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("No country known for ({latitude}, {longitude})")]
    NoMatch { latitude: f64, longitude: f64 },
}

/// Errors that occur while placing files into the archive
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("Failed to read archive folder {path}: {source}")]
    ReadFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Month {year_month} has more than one folder: {first} and {second}")]
    AmbiguousMonthFolder {
        year_month: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Failed to create folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename folder {from} to {to}: {source}")]
    RenameFolder {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid capture date for {name}")]
    InvalidDate { name: String },
}

/// Errors that occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Unknown format in quality order: {0}")]
    UnknownFormat(String),

    #[error("Invalid region {code}: {reason}")]
    InvalidRegion { code: String, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/inbox"),
        };
        assert!(error.to_string().contains("/photos/inbox"));
    }

    #[test]
    fn hash_error_includes_path_and_reason() {
        let error = HashError::DecodeError {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
    }

    #[test]
    fn ambiguous_month_names_both_folders() {
        let error = PlacementError::AmbiguousMonthFolder {
            year_month: "2024_05".to_string(),
            first: PathBuf::from("/archive/2024_05_FR"),
            second: PathBuf::from("/archive/2024_05_DE"),
        };
        let message = error.to_string();
        assert!(message.contains("2024_05_FR"));
        assert!(message.contains("2024_05_DE"));
    }

    #[test]
    fn config_error_converts_to_archive_error() {
        let error: ArchiveError = ConfigError::Missing("source").into();
        assert!(matches!(error, ArchiveError::Config(_)));
        assert!(error.to_string().contains("source"));
    }
}
