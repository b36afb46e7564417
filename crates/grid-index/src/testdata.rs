//! Test data generation utilities.
//!
//! Builds small synthetic reference grids with predictable gids and bakes
//! them to disk for unit and integration tests. Grids are tiny (tens to
//! hundreds of points) so fixtures stay cheap to regenerate per test.

use std::path::Path;

use geogrid_common::{GridPoint, ResolutionTier};

use crate::baked;
use crate::registry::GridSourceConfig;

/// Create a uniform lat/lon grid anchored at (lat0, lon0).
///
/// Gids run row-major starting at 1, so the point at (row, col) has
/// gid `row * cols + col + 1` — easy to predict in assertions.
pub fn uniform_grid(lat0: f64, lon0: f64, rows: u64, cols: u64, step_deg: f64) -> Vec<GridPoint> {
    let mut points = Vec::with_capacity((rows * cols) as usize);
    for r in 0..rows {
        for c in 0..cols {
            points.push(GridPoint::new(
                r * cols + c + 1,
                lat0 + r as f64 * step_deg,
                lon0 + c as f64 * step_deg,
            ));
        }
    }
    points
}

/// The two-point 4km grid from the canonicalization scenarios:
/// gid 1 at (0, 0) and gid 2 at (0, 0.04).
pub fn two_point_4km_grid() -> Vec<GridPoint> {
    vec![GridPoint::new(1, 0.0, 0.0), GridPoint::new(2, 0.0, 0.04)]
}

/// Bake a grid for one tier under `dir` and return the matching config.
pub fn bake_tier(
    dir: &Path,
    tier: ResolutionTier,
    points: &[GridPoint],
) -> std::io::Result<GridSourceConfig> {
    let config = GridSourceConfig::new(dir);
    baked::write_baked(&config.tier_path(tier), points)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid_gids_are_predictable() {
        let points = uniform_grid(0.0, 0.0, 3, 4, 0.1);
        assert_eq!(points.len(), 12);
        assert_eq!(points[0].gid, 1);
        // Point at row 2, col 3.
        assert_eq!(points[11].gid, 12);
        assert!((points[11].lat - 0.2).abs() < 1e-12);
        assert!((points[11].lon - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_bake_tier_is_loadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let points = uniform_grid(40.0, -105.0, 2, 2, 0.1);
        let config = bake_tier(dir.path(), ResolutionTier::Km10, &points).unwrap();

        let loaded =
            baked::read_baked(ResolutionTier::Km10, &config.tier_path(ResolutionTier::Km10))
                .unwrap();
        assert_eq!(loaded, points);
    }
}
