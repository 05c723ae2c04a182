//! Configuration loading.
//!
//! Settings come from a TOML file and are overridden by command-line flags:
//! 1. Command-line flag (highest priority)
//! 2. `--config <file>`, or `<config_dir>/media-archiver/config.toml` if present
//! 3. Built-in defaults
//!
//! ```toml
//! source = "/photos/inbox"
//! destination = "/photos/archive"
//! duplicates = "/photos/duplicates"
//! quality_order = ["jpg", "heic"]
//! ```
//!
//! `quality_order` lists formats from least to most preferred. When two
//! files end up with the same canonical stem, only listed formats are
//! weighed against each other and the loser is demoted. A file in an
//! unlisted format (a Live Photo's `.mov` next to its `.heic`, say) is
//! always placed beside the other file and never demoted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::geocode::{Region, RegionGeocoder};
use crate::core::organize::Buckets;
use crate::core::quality::QualityOrder;
use crate::error::ConfigError;

const APP_DIR: &str = "media-archiver";
const CONFIG_FILE: &str = "config.toml";

/// Raw contents of a config file; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub duplicates: Option<PathBuf>,
    pub unsorted: Option<PathBuf>,
    pub broken: Option<PathBuf>,
    pub review: Option<PathBuf>,
    /// Extensions, least preferred first; unlisted formats never compete
    pub quality_order: Option<Vec<String>>,
    pub seed_from_archive: Option<bool>,
    pub ffprobe: Option<PathBuf>,
    pub regions: Vec<Region>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub duplicates: Option<PathBuf>,
    pub unsorted: Option<PathBuf>,
    pub broken: Option<PathBuf>,
    pub review: Option<PathBuf>,
    pub quality_order: Option<Vec<String>>,
    pub seed_from_archive: bool,
    pub ffprobe: Option<PathBuf>,
}

impl ConfigFile {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse TOML text; `path` is only used in error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the explicit file, else the default file when it exists, else
    /// an empty config
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!(config = %path.display(), "loading config");
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => {
                debug!(config = %path.display(), "loading default config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply command-line values on top of the file
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        fn pick<T>(flag: Option<T>, file: Option<T>) -> Option<T> {
            flag.or(file)
        }

        self.source = pick(overrides.source, self.source);
        self.destination = pick(overrides.destination, self.destination);
        self.duplicates = pick(overrides.duplicates, self.duplicates);
        self.unsorted = pick(overrides.unsorted, self.unsorted);
        self.broken = pick(overrides.broken, self.broken);
        self.review = pick(overrides.review, self.review);
        self.quality_order = pick(overrides.quality_order, self.quality_order);
        self.ffprobe = pick(overrides.ffprobe, self.ffprobe);
        if overrides.seed_from_archive {
            self.seed_from_archive = Some(true);
        }
        self
    }
}

/// `<config_dir>/media-archiver/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Validated settings for a run
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub buckets: Buckets,
    pub quality: QualityOrder,
    /// Hash the archive's images before classifying
    pub seed_from_archive: bool,
    pub ffprobe: PathBuf,
    pub geocoder: RegionGeocoder,
}

impl ArchiveConfig {
    /// Config with defaults for everything but the two required folders
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            buckets: Buckets::default(),
            quality: QualityOrder::default(),
            seed_from_archive: false,
            ffprobe: PathBuf::from("ffprobe"),
            geocoder: RegionGeocoder::default(),
        }
    }

    /// Validate a merged config file
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let source = file.source.ok_or(ConfigError::Missing("source"))?;
        let destination = file.destination.ok_or(ConfigError::Missing("destination"))?;

        let quality = match file.quality_order {
            Some(extensions) => QualityOrder::from_extensions(extensions.as_slice())?,
            None => QualityOrder::default(),
        };

        Ok(Self {
            source,
            destination,
            buckets: Buckets {
                duplicates: file.duplicates,
                unsorted: file.unsorted,
                broken: file.broken,
                review: file.review,
            },
            quality,
            seed_from_archive: file.seed_from_archive.unwrap_or(false),
            ffprobe: file.ffprobe.unwrap_or_else(|| PathBuf::from("ffprobe")),
            geocoder: RegionGeocoder::new(file.regions)?,
        })
    }

    /// Discover the config file, apply overrides and validate
    pub fn resolve(explicit: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_file(ConfigFile::discover(explicit)?.with_overrides(overrides))
    }
}
