//! Coordinates and canonical grid points.

use serde::{Deserialize, Serialize};

/// Canonical grid point identifier.
///
/// Unique within a resolution tier and stable across process runs: gids
/// come from the precomputed grid, never regenerated per call.
pub type Gid = u64;

/// A raw (latitude, longitude) pair in degrees, WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that latitude is in [-90, 90] and longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A single canonical reference location.
///
/// Immutable once loaded from the precomputed grid source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub gid: Gid,
    pub lat: f64,
    pub lon: f64,
}

impl GridPoint {
    /// Create a new grid point.
    pub fn new(gid: Gid, lat: f64, lon: f64) -> Self {
        Self { gid, lat, lon }
    }

    /// The point's coordinate.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}
