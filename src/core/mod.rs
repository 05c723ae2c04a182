//! # Core Module
//!
//! The archiving engine.
//!
//! ## Modules
//! - `scanner` - Lists the media files of the source folder
//! - `metadata` - Reads capture time and GPS position
//! - `hasher` - Computes perceptual hashes
//! - `dedup` - Hash index, duplicate classification and verification
//! - `naming` - Canonical file and folder names
//! - `geocode` - Position to country code
//! - `quality` - Format ranking for name collisions
//! - `organize` - Month folders and file placement
//! - `pipeline` - Orchestrates the full run

pub mod dedup;
pub mod geocode;
pub mod hasher;
pub mod metadata;
pub mod naming;
pub mod organize;
pub mod pipeline;
pub mod quality;
pub mod scanner;

// Re-export commonly used types
pub use dedup::{DuplicateDetector, DuplicateVerdict, HashIndex, IndexKey};
pub use hasher::ImageHash;
pub use metadata::{Coordinates, MediaMetadata};
pub use organize::{FolderCatalog, PlacementEngine};
pub use pipeline::{Pipeline, RunPlan, RunReport};
pub use quality::{resolve_collision, CollisionDecision, QualityOrder};
pub use scanner::{MediaKind, SourceFile};
