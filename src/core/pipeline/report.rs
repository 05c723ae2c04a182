//! Run report and plan types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::core::organize::FolderMerge;
use crate::events::PipelineSummary;

/// Per-file problem, recorded without stopping the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No capture timestamp; routed to unsorted
    MetadataMissing,
    /// Image could not be decoded; routed to broken
    HashFailure,
    /// Copy-named file without an original; routed to review
    UnresolvedDuplicate,
    /// Name already taken in the archive; resolved by format
    FilesystemConflict,
    /// Position known but no country; placed by date alone
    GeocodeUnavailable,
    /// A move or rename failed; the file stays where it was
    PlacementFailed,
    /// The file was placed but a later step failed (folder rename or
    /// demotion of the replaced copy)
    PlacementIncomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIssue {
    pub path: PathBuf,
    pub kind: IssueKind,
    pub detail: String,
}

impl FileIssue {
    pub fn new(path: impl Into<PathBuf>, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// Where a diverted file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivertOutcome {
    Moved(PathBuf),
    Deleted,
    /// No side folder configured
    LeftInSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivertedFile {
    pub from: PathBuf,
    pub outcome: DivertOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Everything a run did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub total_files: usize,
    pub placed: Vec<PlacedFile>,
    /// Confirmed duplicates and lower-quality copies
    pub duplicates: Vec<DivertedFile>,
    pub review: Vec<DivertedFile>,
    pub unsorted: Vec<DivertedFile>,
    pub broken: Vec<DivertedFile>,
    /// Exact-name collisions left in the source
    pub skipped: Vec<PathBuf>,
    /// Files not reached before cancellation
    pub untouched: Vec<PathBuf>,
    pub folders_created: Vec<PathBuf>,
    pub folders_merged: Vec<FolderMerge>,
    pub issues: Vec<FileIssue>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn new(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source,
            destination,
            total_files: 0,
            placed: Vec::new(),
            duplicates: Vec::new(),
            review: Vec::new(),
            unsorted: Vec::new(),
            broken: Vec::new(),
            skipped: Vec::new(),
            untouched: Vec::new(),
            folders_created: Vec::new(),
            folders_merged: Vec::new(),
            issues: Vec::new(),
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn issue(&mut self, path: impl Into<PathBuf>, kind: IssueKind, detail: impl Into<String>) {
        self.issues.push(FileIssue::new(path, kind, detail));
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            total_files: self.total_files,
            placed: self.placed.len(),
            duplicates: self.duplicates.len(),
            unresolved: self.review.len(),
            unsorted: self.unsorted.len(),
            broken: self.broken.len(),
            skipped: self.skipped.len() + self.untouched.len(),
            duration_ms: self.duration_ms,
        }
    }
}

/// What a run would do with a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Place,
    Duplicate,
    Review,
    Unsorted,
    Broken,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Place => write!(f, "place"),
            Disposition::Duplicate => write!(f, "duplicate"),
            Disposition::Review => write!(f, "review"),
            Disposition::Unsorted => write!(f, "unsorted"),
            Disposition::Broken => write!(f, "broken"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub disposition: Disposition,
    /// Canonical name for files that would be placed
    pub target_name: Option<String>,
    /// Canonical file the duplicate matches
    pub duplicate_of: Option<String>,
}

/// Dry-run result: classification without any filesystem change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub source: PathBuf,
    pub entries: Vec<PlanEntry>,
    pub issues: Vec<FileIssue>,
    /// Stopped before classification; `entries` is empty
    pub cancelled: bool,
}

impl RunPlan {
    pub fn count(&self, disposition: Disposition) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.disposition == disposition)
            .count()
    }

    pub fn entry(&self, name: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_lists() {
        let mut report = RunReport::new(PathBuf::from("/in"), PathBuf::from("/out"));
        report.total_files = 3;
        report.placed.push(PlacedFile {
            from: PathBuf::from("/in/a.jpg"),
            to: PathBuf::from("/out/2024_05/20240501_102030.jpg"),
        });
        report.unsorted.push(DivertedFile {
            from: PathBuf::from("/in/b.mp4"),
            outcome: DivertOutcome::LeftInSource,
        });
        report.skipped.push(PathBuf::from("/in/c.jpg"));

        let summary = report.summary();
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.placed, 1);
        assert_eq!(summary.unsorted, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = RunReport::new(PathBuf::from("/in"), PathBuf::from("/out"));
        report.issue("/in/x.jpg", IssueKind::HashFailure, "invalid JPEG");

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("hash_failure"));
        assert!(json.contains(&report.run_id.to_string()));
    }
}
