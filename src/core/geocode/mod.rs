//! # Geocode Module
//!
//! Turns a capture position into an ISO country code.
//!
//! The archive only needs a country per file, so the shipped geocoder is an
//! offline table of bounding boxes loaded from the configuration file. The
//! first region that contains the point wins; list small countries before
//! the large ones that surround them.
//!
//! ```toml
//! [[regions]]
//! code = "FR"
//! min_lat = 41.3
//! max_lat = 51.1
//! min_lon = -5.2
//! max_lon = 9.6
//! ```

use crate::core::metadata::Coordinates;
use crate::error::{ConfigError, GeocodeError};
use serde::{Deserialize, Serialize};

/// Reverse geocoder.
///
/// Callers treat every error as "no country": the file is still archived
/// under its date.
pub trait Geocoder: Send + Sync {
    fn country_code(&self, coordinates: Coordinates) -> Result<String, GeocodeError>;
}

/// A rectangular area mapped to a country code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Region {
    fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRegion {
            code: self.code.clone(),
            reason: reason.to_string(),
        };

        if self.code.len() != 2 || !self.code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid("code must be two upper-case letters"));
        }
        if self.min_lat > self.max_lat || self.min_lon > self.max_lon {
            return Err(invalid("minimum is greater than maximum"));
        }
        if Coordinates::new(self.min_lat, self.min_lon).is_none()
            || Coordinates::new(self.max_lat, self.max_lon).is_none()
        {
            return Err(invalid("bounds are outside valid latitude/longitude"));
        }
        Ok(())
    }
}

/// Offline geocoder over an ordered list of regions
#[derive(Debug, Clone, Default)]
pub struct RegionGeocoder {
    regions: Vec<Region>,
}

impl RegionGeocoder {
    /// Build a geocoder, validating every region
    pub fn new(regions: Vec<Region>) -> Result<Self, ConfigError> {
        for region in &regions {
            region.validate()?;
        }
        Ok(Self { regions })
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Geocoder for RegionGeocoder {
    fn country_code(&self, coordinates: Coordinates) -> Result<String, GeocodeError> {
        self.regions
            .iter()
            .find(|region| region.contains(coordinates))
            .map(|region| region.code.clone())
            .ok_or(GeocodeError::NoMatch {
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
            })
    }
}
