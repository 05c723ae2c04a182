//! # Quality Module
//!
//! Ranks file formats and decides which copy survives when two files
//! compete for the same archive name.

use serde::{Deserialize, Serialize};

use crate::core::scanner::MediaKind;
use crate::error::ConfigError;

/// Formats in preference order, least preferred first.
///
/// Only listed formats compete with each other. A file whose format is not
/// listed never displaces, and is never displaced by, a same-stem file of
/// another format: both are kept side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOrder(Vec<MediaKind>);

impl Default for QualityOrder {
    fn default() -> Self {
        Self(vec![MediaKind::Jpeg, MediaKind::Heic])
    }
}

impl QualityOrder {
    pub fn new(kinds: Vec<MediaKind>) -> Self {
        let mut order: Vec<MediaKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        Self(order)
    }

    /// Build an order from extension names such as `["heic", "jpg"]`
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self, ConfigError> {
        let kinds = extensions
            .iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().trim_start_matches('.');
                match MediaKind::from_extension(ext) {
                    MediaKind::Other => Err(ConfigError::UnknownFormat(ext.to_string())),
                    kind => Ok(kind),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(kinds))
    }

    /// Position in the order; higher is better
    pub fn rank(&self, kind: MediaKind) -> Option<usize> {
        self.0.iter().position(|k| *k == kind)
    }

    /// Whether two formats are ranked against each other
    pub fn competes(&self, a: MediaKind, b: MediaKind) -> bool {
        self.rank(a).is_some() && self.rank(b).is_some()
    }

    /// Sort key placing the most preferred format first
    pub fn preference_key(&self, kind: MediaKind) -> usize {
        match self.rank(kind) {
            Some(rank) => self.0.len() - 1 - rank,
            None => self.0.len(),
        }
    }

    pub fn kinds(&self) -> &[MediaKind] {
        &self.0
    }
}

/// Which file keeps the contested name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionDecision {
    /// The file already in the archive stays; the incoming one is diverted
    KeepResident,
    /// The incoming file replaces the resident, which is diverted
    KeepIncoming,
}

/// Decide between the resident file and an incoming one with the same stem.
///
/// The incoming file wins only when both formats are ranked and it is
/// strictly better. Callers check [`QualityOrder::competes`] first.
pub fn resolve_collision(
    order: &QualityOrder,
    resident: MediaKind,
    incoming: MediaKind,
) -> CollisionDecision {
    match (order.rank(resident), order.rank(incoming)) {
        (Some(r), Some(i)) if i > r => CollisionDecision::KeepIncoming,
        _ => CollisionDecision::KeepResident,
    }
}
