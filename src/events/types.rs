//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the archiving pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Source listing
    Scan(ScanEvent),
    /// Metadata extraction and hashing
    Analyze(AnalyzeEvent),
    /// Duplicate classification and verification
    Classify(ClassifyEvent),
    /// Renaming and placement
    Place(PlaceEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    Started { path: PathBuf },
    FileFound { path: PathBuf },
    Completed { total_files: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnalyzeEvent {
    Started { total_files: usize },
    /// One more file analyzed (events may arrive out of order)
    Progress { completed: usize, total: usize, current_path: PathBuf },
    Completed { hashed: usize, broken: usize, undated: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifyEvent {
    Verdict { name: String, verdict: String },
    /// A duplicate could not be confirmed and goes to manual review
    Unresolved { name: String },
    Completed { unique: usize, duplicates: usize, unresolved: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlaceEvent {
    Started { total_files: usize },
    Placed { from: PathBuf, to: PathBuf },
    /// File sent to a bucket (duplicates, unsorted, broken, review) or deleted
    Diverted { path: PathBuf, bucket: String },
    FolderCreated { path: PathBuf },
    FolderMerged { from: PathBuf, to: PathBuf },
    Error { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    Started,
    PhaseChanged { phase: PipelinePhase },
    Completed { summary: PipelineSummary },
    Cancelled,
}

/// Phases of a run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Analyzing,
    Classifying,
    Verifying,
    Placing,
}

/// Counts reported when a run completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total_files: usize,
    pub placed: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub unsorted: usize,
    pub broken: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Analyzing => write!(f, "Analyzing"),
            PipelinePhase::Classifying => write!(f, "Classifying"),
            PipelinePhase::Verifying => write!(f, "Verifying"),
            PipelinePhase::Placing => write!(f, "Placing"),
        }
    }
}
