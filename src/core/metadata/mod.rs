//! # Metadata Module
//!
//! Reads capture time and GPS position from media files.
//!
//! ## Sources
//! - Photos (JPEG, HEIC, PNG): EXIF `DateTimeOriginal` (falling back to
//!   `DateTime`) and the GPS latitude/longitude triplets
//! - Videos and audio (MOV, MP4, MP3): the container's `creation_time` tag via
//!   a [`VideoProbe`]; these never carry a position
//!
//! Extraction never fails: a file without a usable timestamp yields `None`
//! and the caller routes it to the unsorted bucket.

mod exif_reader;
mod probe;

pub use exif_reader::{dms_to_decimal, parse_exif_datetime, read_exif, ExifFields};
pub use probe::{parse_creation_time, FfprobeProbe, VideoProbe};

use crate::core::scanner::MediaKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a position, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Normalized metadata of one media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Capture date and time, as recorded by the device
    pub captured_at: NaiveDateTime,
    /// Capture position, when the container has a well-formed GPS block
    pub coordinates: Option<Coordinates>,
}

/// Reads normalized metadata from a file.
///
/// Implementations must not fail: unsupported, corrupt or undated files
/// return `None`.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Option<MediaMetadata>;
}

/// Default extractor: EXIF for photos, a [`VideoProbe`] for videos and audio
pub struct ContainerExtractor {
    probe: Box<dyn VideoProbe>,
}

impl ContainerExtractor {
    pub fn new(probe: Box<dyn VideoProbe>) -> Self {
        Self { probe }
    }
}

impl Default for ContainerExtractor {
    fn default() -> Self {
        Self::new(Box::new(FfprobeProbe::default()))
    }
}

impl MetadataExtractor for ContainerExtractor {
    fn extract(&self, path: &Path) -> Option<MediaMetadata> {
        if MediaKind::from_path(path).is_timed_media() {
            return match self.probe.creation_time(path) {
                Ok(Some(captured_at)) => Some(MediaMetadata {
                    captured_at,
                    coordinates: None,
                }),
                Ok(None) => {
                    debug!(path = %path.display(), "no creation time in container");
                    None
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "video probe failed");
                    None
                }
            };
        }

        let fields = read_exif(path)?;
        let Some(captured_at) = fields.captured_at else {
            debug!(path = %path.display(), "no EXIF timestamp");
            return None;
        };

        Some(MediaMetadata {
            captured_at,
            coordinates: fields.coordinates,
        })
    }
}
