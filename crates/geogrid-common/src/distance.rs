//! Great-circle distance on a spherical Earth.
//!
//! This is the single distance metric used by every resolution tier:
//! haversine great-circle distance with a mean Earth radius of 6371 km.
//! Nearest-neighbor search operates on chord distance over the unit
//! sphere, which orders candidate points identically.

use crate::point::Coordinate;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the haversine distance between two coordinates in kilometers.
pub fn haversine_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Project a coordinate onto the unit sphere as an (x, y, z) position.
pub fn unit_sphere(coord: Coordinate) -> [f64; 3] {
    let lat_rad = coord.lat.to_radians();
    let lon_rad = coord.lon.to_radians();
    [
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    ]
}

/// Convert a chord length on the unit sphere to great-circle kilometers.
pub fn chord_to_km(chord: f64) -> f64 {
    EARTH_RADIUS_KM * 2.0 * (chord / 2.0).clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // London to Paris is roughly 344 km.
        let london = Coordinate::new(51.5074, -0.1278);
        let paris = Coordinate::new(48.8566, 2.3522);
        let d = haversine_distance_km(london, paris);
        assert!(d > 330.0 && d < 360.0, "got {}", d);
    }

    #[test]
    fn test_haversine_same_point() {
        let p = Coordinate::new(35.2, -97.5);
        assert!(haversine_distance_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_chord_matches_haversine() {
        let a = Coordinate::new(39.7, -105.2);
        let b = Coordinate::new(40.0, -105.0);
        let pa = unit_sphere(a);
        let pb = unit_sphere(b);
        let chord = ((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2) + (pa[2] - pb[2]).powi(2))
            .sqrt();
        let via_chord = chord_to_km(chord);
        let via_haversine = haversine_distance_km(a, b);
        assert!((via_chord - via_haversine).abs() < 1e-6);
    }

    #[test]
    fn test_unit_sphere_is_unit_length() {
        let p = unit_sphere(Coordinate::new(-33.9, 151.2));
        let norm = (p[0].powi(2) + p[1].powi(2) + p[2].powi(2)).sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
