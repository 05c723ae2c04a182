//! Archive organization module.
//!
//! Places dated files into `YYYY_MM[_countries]` folders, merging country
//! tags into existing folders and resolving name collisions by format.

mod catalog;
mod engine;
mod executor;
mod types;

pub use catalog::FolderCatalog;
pub use engine::PlacementEngine;
pub use executor::{divert, ensure_dir, move_file, remove_file, unique_destination};
pub use types::*;
