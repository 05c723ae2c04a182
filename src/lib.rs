//! # Media Archiver
//!
//! Sorts a flat folder of photos and videos into a deduplicated archive of
//! month folders tagged with the countries they were taken in.
//!
//! ## Core Philosophy
//! - **Never overwrite** - a name clash is resolved by format, or the file is quarantined
//! - **Never abort on one bad file** - it goes to a side folder and into the report
//! - **Idempotent** - archived names are recognized and re-placed unchanged
//!
//! ## Architecture
//! - `core` - The archiving engine
//! - `config` - TOML configuration with command-line overrides
//! - `events` - Event-driven progress reporting
//! - `error` - Error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ArchiveError, Result};

/// Initialize tracing for the library
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
/// This should be called by the application entry point.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // A subscriber may already be installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
