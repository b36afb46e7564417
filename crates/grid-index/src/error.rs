//! Error types for grid indexing and canonicalization.

use geogrid_common::{Gid, ResolutionTier};
use thiserror::Error;

/// Errors that can occur while loading a reference grid or snapping
/// coordinates onto it.
#[derive(Error, Debug)]
pub enum GridIndexError {
    /// The baked grid source for a tier could not be located or read.
    #[error("grid data unavailable for tier {tier}: {message}")]
    GridDataUnavailable {
        tier: ResolutionTier,
        message: String,
    },

    /// The baked grid source was read but is structurally invalid.
    #[error("grid data corrupt for tier {tier}: {message}")]
    GridDataCorrupt {
        tier: ResolutionTier,
        message: String,
    },

    /// Two distinct input rows snapped to the same grid identifier without
    /// the caller opting into collapse.
    #[error("rows {first_row} and {second_row} both snap to gid {gid}; \
             collapsing would silently discard data")]
    NonUniqueMapping {
        gid: Gid,
        first_row: usize,
        second_row: usize,
    },

    /// A coordinate has no grid point within the configured snap radius.
    #[error("row {row} has no grid point within {max_km} km (nearest is {distance_km:.3} km away)")]
    NoGridPointWithinRadius {
        row: usize,
        distance_km: f64,
        max_km: f64,
    },
}

impl GridIndexError {
    /// Create a GridDataUnavailable error.
    pub fn unavailable(tier: ResolutionTier, msg: impl Into<String>) -> Self {
        Self::GridDataUnavailable {
            tier,
            message: msg.into(),
        }
    }

    /// Create a GridDataCorrupt error.
    pub fn corrupt(tier: ResolutionTier, msg: impl Into<String>) -> Self {
        Self::GridDataCorrupt {
            tier,
            message: msg.into(),
        }
    }
}

/// Result type for grid index operations.
pub type Result<T> = std::result::Result<T, GridIndexError>;
