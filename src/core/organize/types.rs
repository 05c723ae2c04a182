//! Types for the organize module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::naming::{canonical_folder_name, YearMonth};

/// One `YYYY_MM[_countries]` directory of the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFolder {
    pub year_month: YearMonth,
    /// Country codes in the order they were first added
    pub countries: Vec<String>,
    pub path: PathBuf,
}

impl ArchiveFolder {
    pub fn has_country(&self, code: &str) -> bool {
        self.countries.iter().any(|c| c == code)
    }

    /// Directory name derived from the month and the country list
    pub fn name(&self) -> String {
        canonical_folder_name(self.year_month, &self.countries)
    }
}

/// Where the month's folder stood when a file arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderState {
    /// No folder for the month; one is created
    NoFolderForMonth,
    /// Folder exists and already lists the file's country
    FolderExistsSameCountry,
    /// Folder exists without the file's country; the country is appended
    FolderExistsDifferentCountry,
    /// Folder exists and the file has no country of its own
    FolderExistsNoCountry,
}

/// Optional side folders files are diverted to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buckets {
    /// Quarantine for duplicates and demoted files; without it they are deleted
    pub duplicates: Option<PathBuf>,
    /// Files without a capture date
    pub unsorted: Option<PathBuf>,
    /// Files that could not be decoded
    pub broken: Option<PathBuf>,
    /// Duplicates that could not be confirmed
    pub review: Option<PathBuf>,
}

impl Buckets {
    pub fn path(&self, bucket: Bucket) -> Option<&Path> {
        match bucket {
            Bucket::Duplicates => self.duplicates.as_deref(),
            Bucket::Unsorted => self.unsorted.as_deref(),
            Bucket::Broken => self.broken.as_deref(),
            Bucket::Review => self.review.as_deref(),
        }
    }

    /// Every configured bucket directory
    pub fn configured(&self) -> impl Iterator<Item = (Bucket, &Path)> {
        Bucket::ALL
            .into_iter()
            .filter_map(move |bucket| self.path(bucket).map(|path| (bucket, path)))
    }
}

/// Names of the side folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Duplicates,
    Unsorted,
    Broken,
    Review,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Duplicates,
        Bucket::Unsorted,
        Bucket::Broken,
        Bucket::Review,
    ];
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Duplicates => write!(f, "duplicates"),
            Bucket::Unsorted => write!(f, "unsorted"),
            Bucket::Broken => write!(f, "broken"),
            Bucket::Review => write!(f, "review"),
        }
    }
}

/// What happened to a file that lost its place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demotion {
    /// Moved into the duplicates quarantine
    Quarantined { from: PathBuf, to: PathBuf },
    /// Permanently deleted (no quarantine configured)
    Deleted(PathBuf),
    /// Left where it was
    Skipped(PathBuf),
}

/// A file to place into the archive
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRequest {
    /// Current location, normally in the source folder
    pub path: PathBuf,
    pub captured_at: chrono::NaiveDateTime,
    pub country: Option<String>,
    /// Extension as found on the source file, re-appended unchanged
    pub extension: String,
}

/// Result of placing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementOutcome {
    /// File moved into the archive
    Placed {
        destination: PathBuf,
        state: FolderState,
        /// Lower-quality resident that made room for this file
        displaced: Option<Demotion>,
        /// Steps that failed after the file was already moved in
        warnings: Vec<String>,
    },
    /// File kept out of the archive because `existing` wins
    Rejected {
        existing: PathBuf,
        demotion: Demotion,
    },
}

/// A folder rename caused by a new country
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMerge {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_follows_countries() {
        let folder = ArchiveFolder {
            year_month: YearMonth::new(2024, 5).unwrap(),
            countries: vec!["FR".to_string(), "DE".to_string()],
            path: PathBuf::from("/archive/2024_05_FR,DE"),
        };
        assert_eq!(folder.name(), "2024_05_FR,DE");
        assert!(folder.has_country("DE"));
        assert!(!folder.has_country("IT"));
    }

    #[test]
    fn configured_buckets_skip_missing() {
        let buckets = Buckets {
            duplicates: Some(PathBuf::from("/dups")),
            review: Some(PathBuf::from("/review")),
            ..Default::default()
        };
        let configured: Vec<_> = buckets.configured().map(|(b, _)| b).collect();
        assert_eq!(configured, vec![Bucket::Duplicates, Bucket::Review]);
    }
}
