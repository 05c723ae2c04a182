//! # media-archive CLI
//!
//! Command-line interface for the media archiver.
//!
//! ## Usage
//! ```bash
//! media-archive organize --source ~/Inbox --destination ~/Archive --duplicates ~/Duplicates
//! media-archive plan --config archive.toml --output json
//! ```

mod cli;

use media_archiver::Result;

fn main() -> Result<()> {
    cli::run()
}
