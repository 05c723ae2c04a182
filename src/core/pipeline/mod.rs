//! # Pipeline Module
//!
//! Orchestrates a full archiving run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - List the media files of the source folder
//! 2. **Analyze** - Read capture metadata and hash images (parallel)
//! 3. **Classify** - Assign unique/duplicate verdicts in a fixed order
//! 4. **Verify** - Confirm duplicates; unconfirmed ones go to review
//! 5. **Place** - Rename and move files into month folders (single writer)
//!
//! ## Parallelism
//! Only the analysis stage runs on rayon's pool. Everything that reads or
//! writes the index or the archive runs on the calling thread.

mod executor;
mod report;

pub use executor::{AnalyzedFile, CancellationToken, HashOutcome, Pipeline, PipelineBuilder};
pub use report::{
    DivertOutcome, DivertedFile, Disposition, FileIssue, IssueKind, PlacedFile, PlanEntry,
    RunPlan, RunReport,
};
