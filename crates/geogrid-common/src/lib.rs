//! Common types shared across the geogridstore workspace.

pub mod distance;
pub mod point;
pub mod tier;

pub use distance::{haversine_distance_km, unit_sphere, EARTH_RADIUS_KM};
pub use point::{Coordinate, Gid, GridPoint};
pub use tier::ResolutionTier;
