//! Static nearest-neighbor index over reference grid points.
//!
//! Grid points are projected onto the unit sphere and arranged as an
//! implicit kd-tree (median element of each range is the node, halves are
//! the subtrees). Searching compares squared chord distance, which orders
//! candidates identically to great-circle distance; reported distances
//! are converted back to kilometers.
//!
//! Ties at equal distance resolve to the lowest gid, so two indexes built
//! from the same grid answer every query identically regardless of
//! internal layout.

use geogrid_common::{distance, Coordinate, Gid, GridPoint};
use rayon::prelude::*;

use crate::canonicalize::Snap;

#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    pos: [f64; 3],
    gid: Gid,
}

/// Nearest-neighbor search structure built once per resolution tier.
#[derive(Debug)]
pub struct SpatialIndex {
    nodes: Vec<IndexedPoint>,
}

impl SpatialIndex {
    /// Build an index from a set of grid points.
    ///
    /// Deterministic: the same points always produce an index that answers
    /// identical queries.
    pub fn build(points: &[GridPoint]) -> Self {
        let mut nodes: Vec<IndexedPoint> = points
            .iter()
            .map(|p| IndexedPoint {
                pos: distance::unit_sphere(p.coordinate()),
                gid: p.gid,
            })
            .collect();

        let len = nodes.len();
        if len > 1 {
            build_range(&mut nodes, 0, len, 0);
        }

        Self { nodes }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the closest grid point to a coordinate.
    ///
    /// Returns `None` only for an empty index. No distance threshold is
    /// applied here; arbitrarily far queries still return the closest
    /// point, and radius policy belongs to the canonicalizer.
    pub fn nearest(&self, coord: Coordinate) -> Option<Snap> {
        if self.nodes.is_empty() {
            return None;
        }

        let target = distance::unit_sphere(coord);
        let mut best = Best {
            dist2: f64::INFINITY,
            gid: Gid::MAX,
        };
        self.nearest_in(0, self.nodes.len(), 0, &target, &mut best);

        Some(Snap {
            gid: best.gid,
            distance_km: distance::chord_to_km(best.dist2.sqrt()),
        })
    }

    /// Vectorized form of [`nearest`](Self::nearest).
    ///
    /// Results are identical to calling `nearest` once per coordinate, in
    /// input order; the batch is searched in parallel.
    pub fn nearest_batch(&self, coords: &[Coordinate]) -> Vec<Option<Snap>> {
        coords.par_iter().map(|c| self.nearest(*c)).collect()
    }

    fn nearest_in(&self, lo: usize, hi: usize, depth: usize, target: &[f64; 3], best: &mut Best) {
        if lo >= hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let node = &self.nodes[mid];

        let d2 = chord2(&node.pos, target);
        if d2 < best.dist2 || (d2 == best.dist2 && node.gid < best.gid) {
            best.dist2 = d2;
            best.gid = node.gid;
        }

        let axis = depth % 3;
        let diff = target[axis] - node.pos[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.nearest_in(near.0, near.1, depth + 1, target, best);

        // The far half can still hold the winner when the splitting plane
        // is closer than the current best, or exactly as close (ties must
        // be found to resolve toward the lowest gid).
        if diff * diff <= best.dist2 {
            self.nearest_in(far.0, far.1, depth + 1, target, best);
        }
    }
}

struct Best {
    dist2: f64,
    gid: Gid,
}

fn chord2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

fn build_range(nodes: &mut [IndexedPoint], lo: usize, hi: usize, depth: usize) {
    if hi - lo <= 1 {
        return;
    }

    let axis = depth % 3;
    let mid = lo + (hi - lo) / 2;
    nodes[lo..hi].select_nth_unstable_by(mid - lo, |a, b| {
        a.pos[axis]
            .total_cmp(&b.pos[axis])
            .then_with(|| a.gid.cmp(&b.gid))
    });

    build_range(nodes, lo, mid, depth + 1);
    build_range(nodes, mid + 1, hi, depth + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use geogrid_common::haversine_distance_km;

    fn uniform_grid(rows: u64, cols: u64, step_deg: f64) -> Vec<GridPoint> {
        let mut points = Vec::with_capacity((rows * cols) as usize);
        for r in 0..rows {
            for c in 0..cols {
                points.push(GridPoint::new(
                    r * cols + c + 1,
                    r as f64 * step_deg,
                    c as f64 * step_deg,
                ));
            }
        }
        points
    }

    /// Scan all points for the expected answer, with the same tie-break.
    fn brute_force(points: &[GridPoint], coord: Coordinate) -> (Gid, f64) {
        let mut best: Option<(Gid, f64)> = None;
        for p in points {
            let pos = distance::unit_sphere(p.coordinate());
            let d2 = chord2(&pos, &distance::unit_sphere(coord));
            let better = match best {
                None => true,
                Some((bg, bd)) => d2 < bd || (d2 == bd && p.gid < bg),
            };
            if better {
                best = Some((p.gid, d2));
            }
        }
        let (gid, d2) = best.unwrap();
        (gid, distance::chord_to_km(d2.sqrt()))
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points = uniform_grid(12, 17, 0.25);
        let index = SpatialIndex::build(&points);

        let queries = [
            Coordinate::new(0.13, 0.52),
            Coordinate::new(2.9, 4.01),
            Coordinate::new(-1.0, -1.0),
            Coordinate::new(2.75, 2.125),
            Coordinate::new(10.0, 10.0),
        ];
        for q in queries {
            let snap = index.nearest(q).expect("non-empty index");
            let (gid, dist) = brute_force(&points, q);
            assert_eq!(snap.gid, gid, "query {:?}", q);
            assert!((snap.distance_km - dist).abs() < 1e-9);
        }
    }

    #[test]
    fn test_spec_two_point_scenario() {
        // 4km-style tier with two points; (0.0, 0.01) is closer to gid 1.
        let points = vec![GridPoint::new(1, 0.0, 0.0), GridPoint::new(2, 0.0, 0.04)];
        let index = SpatialIndex::build(&points);

        let snap = index.nearest(Coordinate::new(0.0, 0.01)).unwrap();
        assert_eq!(snap.gid, 1);
    }

    #[test]
    fn test_tie_breaks_to_lowest_gid() {
        // Query is exactly between two symmetric points; higher gid listed
        // first to prove ordering does not decide the winner.
        let points = vec![GridPoint::new(9, 0.0, 1.0), GridPoint::new(3, 0.0, -1.0)];
        let index = SpatialIndex::build(&points);

        let snap = index.nearest(Coordinate::new(0.0, 0.0)).unwrap();
        assert_eq!(snap.gid, 3);
    }

    #[test]
    fn test_two_builds_answer_identically() {
        let points = uniform_grid(9, 9, 0.1);
        let a = SpatialIndex::build(&points);
        let b = SpatialIndex::build(&points);

        for q in [
            Coordinate::new(0.05, 0.05),
            Coordinate::new(0.333, 0.777),
            Coordinate::new(-0.4, 0.9),
        ] {
            assert_eq!(a.nearest(q).unwrap().gid, b.nearest(q).unwrap().gid);
        }
    }

    #[test]
    fn test_batch_matches_single_queries_in_order() {
        let points = uniform_grid(6, 6, 0.5);
        let index = SpatialIndex::build(&points);

        let queries: Vec<Coordinate> = (0..40)
            .map(|i| Coordinate::new(0.07 * i as f64, 0.11 * i as f64))
            .collect();

        let batch = index.nearest_batch(&queries);
        assert_eq!(batch.len(), queries.len());
        for (i, q) in queries.iter().enumerate() {
            assert_eq!(batch[i].unwrap().gid, index.nearest(*q).unwrap().gid);
        }
    }

    #[test]
    fn test_far_query_still_returns_closest() {
        let points = uniform_grid(2, 2, 0.04);
        let index = SpatialIndex::build(&points);

        let q = Coordinate::new(-60.0, 120.0);
        let snap = index.nearest(q).unwrap();
        let expected = points
            .iter()
            .map(|p| haversine_distance_km(p.coordinate(), q))
            .fold(f64::INFINITY, f64::min);
        assert!((snap.distance_km - expected).abs() < 1e-6);
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.nearest(Coordinate::new(0.0, 0.0)).is_none());
    }
}
