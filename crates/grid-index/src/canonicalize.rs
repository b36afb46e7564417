//! Batch canonicalization of raw coordinates onto grid identifiers.
//!
//! Downstream storage assumes one row per physical location, so the
//! default policy hard-fails when two distinct input rows snap to the
//! same gid; callers that have already aggregated their rows opt into
//! collapse explicitly.

use std::collections::HashMap;

use geogrid_common::{Coordinate, Gid, ResolutionTier};

use crate::error::{GridIndexError, Result};
use crate::registry::RefGridRegistry;

/// One coordinate snapped onto the reference grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Canonical grid point identifier.
    pub gid: Gid,
    /// Great-circle distance from the query coordinate, in kilometers.
    pub distance_km: f64,
}

/// Policy knobs for a canonicalization call.
#[derive(Debug, Clone)]
pub struct SnapOptions {
    /// Accept multiple input rows snapping to one gid. Requires the caller
    /// to have pre-aggregated the corresponding data rows.
    pub allow_collapse: bool,
    /// Maximum snap distance; rows whose nearest point is farther are
    /// reported as unmapped instead of silently snapping far away.
    pub max_distance_km: Option<f64>,
    /// Abort the whole batch on the first unmapped row instead of
    /// collecting per-row failures.
    pub fail_fast: bool,
}

impl Default for SnapOptions {
    fn default() -> Self {
        Self {
            allow_collapse: false,
            max_distance_km: None,
            fail_fast: false,
        }
    }
}

/// A row that could not be mapped within the snap radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnmappedRow {
    /// Index of the offending coordinate in the input batch.
    pub row: usize,
    /// Distance to the nearest grid point that was rejected.
    pub distance_km: f64,
}

/// Result of canonicalizing one coordinate batch.
///
/// `snaps[i]` is `Some` exactly when input row `i` mapped within the snap
/// radius; unmapped rows are listed separately with their distances.
/// Output length always equals input length.
#[derive(Debug, Clone)]
pub struct CanonicalBatch {
    pub snaps: Vec<Option<Snap>>,
    pub unmapped: Vec<UnmappedRow>,
    /// Rows dropped in favor of an earlier row with the same gid; empty
    /// unless `allow_collapse` was set and duplicates occurred.
    pub collapsed: Vec<usize>,
}

impl CanonicalBatch {
    /// Indexes of rows that mapped and survived collapse, in input order.
    pub fn mapped_rows(&self) -> Vec<usize> {
        (0..self.snaps.len())
            .filter(|i| self.snaps[*i].is_some() && !self.collapsed.contains(i))
            .collect()
    }

    /// Gids of the surviving rows, in input order.
    pub fn gids(&self) -> Vec<Gid> {
        self.snaps
            .iter()
            .enumerate()
            .filter(|(row, _)| !self.collapsed.contains(row))
            .filter_map(|(_, snap)| snap.as_ref().map(|s| s.gid))
            .collect()
    }
}

/// Maps coordinate batches to canonical identifiers via the registry.
pub struct Canonicalizer<'a> {
    registry: &'a RefGridRegistry,
}

impl<'a> Canonicalizer<'a> {
    /// Create a canonicalizer over a grid registry.
    pub fn new(registry: &'a RefGridRegistry) -> Self {
        Self { registry }
    }

    /// Snap a batch of coordinates to the given tier's identifiers.
    ///
    /// Resolves the tier's grid and index (building lazily if absent),
    /// queries every coordinate in input order, then applies the snap
    /// radius and uniqueness policies from `opts`.
    pub fn canonicalize(
        &self,
        tier: ResolutionTier,
        coords: &[Coordinate],
        opts: &SnapOptions,
    ) -> Result<CanonicalBatch> {
        let grid = self.registry.load(tier)?;
        let raw = grid.nearest_batch(coords);

        let mut snaps: Vec<Option<Snap>> = Vec::with_capacity(raw.len());
        let mut unmapped = Vec::new();
        for (row, snap) in raw.into_iter().enumerate() {
            match opts.max_distance_km {
                Some(max_km) if snap.distance_km > max_km => {
                    if opts.fail_fast {
                        return Err(GridIndexError::NoGridPointWithinRadius {
                            row,
                            distance_km: snap.distance_km,
                            max_km,
                        });
                    }
                    unmapped.push(UnmappedRow {
                        row,
                        distance_km: snap.distance_km,
                    });
                    snaps.push(None);
                }
                _ => snaps.push(Some(snap)),
            }
        }

        let mut first_row_for_gid: HashMap<Gid, usize> = HashMap::new();
        let mut collapsed = Vec::new();
        for (row, snap) in snaps.iter().enumerate() {
            let Some(snap) = snap else { continue };
            match first_row_for_gid.get(&snap.gid) {
                None => {
                    first_row_for_gid.insert(snap.gid, row);
                }
                Some(_) if opts.allow_collapse => {
                    collapsed.push(row);
                }
                Some(&first_row) => {
                    return Err(GridIndexError::NonUniqueMapping {
                        gid: snap.gid,
                        first_row,
                        second_row: row,
                    });
                }
            }
        }

        if !unmapped.is_empty() {
            tracing::warn!(
                tier = %tier,
                rows = unmapped.len(),
                "coordinates beyond snap radius were left unmapped"
            );
        }

        Ok(CanonicalBatch {
            snaps,
            unmapped,
            collapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baked;
    use crate::registry::GridSourceConfig;
    use geogrid_common::GridPoint;

    fn registry_with_grid(
        points: &[GridPoint],
        tier: ResolutionTier,
    ) -> (tempfile::TempDir, RefGridRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = GridSourceConfig::new(dir.path());
        baked::write_baked(&config.tier_path(tier), points).unwrap();
        (dir, RefGridRegistry::new(config))
    }

    fn two_point_grid() -> Vec<GridPoint> {
        vec![GridPoint::new(1, 0.0, 0.0), GridPoint::new(2, 0.0, 0.04)]
    }

    #[test]
    fn test_order_and_length_preserved() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);

        let coords = vec![
            Coordinate::new(0.0, 0.039),
            Coordinate::new(0.0, 0.001),
        ];
        let batch = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &SnapOptions::default())
            .unwrap();

        assert_eq!(batch.snaps.len(), coords.len());
        assert_eq!(batch.snaps[0].unwrap().gid, 2);
        assert_eq!(batch.snaps[1].unwrap().gid, 1);
        assert_eq!(batch.gids(), vec![2, 1]);
    }

    #[test]
    fn test_non_unique_mapping_fails_by_default() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);

        // Both coordinates are closest to gid 1.
        let coords = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)];
        let err = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &SnapOptions::default())
            .unwrap_err();

        match err {
            GridIndexError::NonUniqueMapping {
                gid,
                first_row,
                second_row,
            } => {
                assert_eq!(gid, 1);
                assert_eq!(first_row, 0);
                assert_eq!(second_row, 1);
            }
            other => panic!("expected NonUniqueMapping, got {other:?}"),
        }
    }

    #[test]
    fn test_collapse_opt_in_keeps_first_row() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);

        let coords = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)];
        let opts = SnapOptions {
            allow_collapse: true,
            ..SnapOptions::default()
        };
        let batch = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &opts)
            .unwrap();

        assert_eq!(batch.collapsed, vec![1]);
        assert_eq!(batch.mapped_rows(), vec![0]);
        assert_eq!(batch.gids(), vec![1]);
    }

    #[test]
    fn test_snap_radius_collects_unmapped_rows() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);

        let coords = vec![
            Coordinate::new(0.0, 0.001),
            Coordinate::new(45.0, 90.0), // thousands of km away
        ];
        let opts = SnapOptions {
            max_distance_km: Some(10.0),
            ..SnapOptions::default()
        };
        let batch = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &opts)
            .unwrap();

        assert_eq!(batch.snaps.len(), 2);
        assert!(batch.snaps[0].is_some());
        assert!(batch.snaps[1].is_none());
        assert_eq!(batch.unmapped.len(), 1);
        assert_eq!(batch.unmapped[0].row, 1);
        assert!(batch.unmapped[0].distance_km > 10.0);
    }

    #[test]
    fn test_snap_radius_fail_fast() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);

        let coords = vec![Coordinate::new(45.0, 90.0)];
        let opts = SnapOptions {
            max_distance_km: Some(10.0),
            fail_fast: true,
            ..SnapOptions::default()
        };
        let err = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &opts)
            .unwrap_err();
        assert!(matches!(err, GridIndexError::NoGridPointWithinRadius { row: 0, .. }));
    }

    #[test]
    fn test_returned_gids_are_grid_members() {
        let (_dir, registry) = registry_with_grid(&two_point_grid(), ResolutionTier::Km4);
        let canonicalizer = Canonicalizer::new(&registry);
        let grid = registry.load(ResolutionTier::Km4).unwrap();

        let coords = vec![Coordinate::new(0.02, 0.02), Coordinate::new(-1.0, 0.05)];
        let opts = SnapOptions {
            allow_collapse: true,
            ..SnapOptions::default()
        };
        let batch = canonicalizer
            .canonicalize(ResolutionTier::Km4, &coords, &opts)
            .unwrap();
        for gid in batch.gids() {
            assert!(grid.contains(gid));
        }
    }
}
