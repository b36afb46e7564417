//! Per-tier reference grid cache.
//!
//! `RefGridRegistry` replaces ambient module-level state with an explicit,
//! process-wide object: each tier's grid is loaded lazily on first use,
//! validated, paired with its spatial index, and then shared read-only for
//! the rest of the process (or until `invalidate`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use geogrid_common::{Coordinate, Gid, GridPoint, ResolutionTier};
use serde::{Deserialize, Serialize};

use crate::baked;
use crate::canonicalize::Snap;
use crate::error::{GridIndexError, Result};
use crate::kdtree::SpatialIndex;

/// Where the baked per-tier grid files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSourceConfig {
    /// Directory holding one `<tier>.ggrd` file per resolution tier.
    pub baked_dir: PathBuf,
}

impl GridSourceConfig {
    /// Create a config rooted at the given directory.
    pub fn new(baked_dir: impl Into<PathBuf>) -> Self {
        Self {
            baked_dir: baked_dir.into(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        std::env::var("GEOGRID_BAKED_DIR").ok().map(Self::new)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.baked_dir.as_os_str().is_empty() {
            return Err("baked_dir must not be empty".to_string());
        }
        Ok(())
    }

    /// Path of the baked file for a tier.
    pub fn tier_path(&self, tier: ResolutionTier) -> PathBuf {
        self.baked_dir.join(format!("{}.ggrd", tier.as_str()))
    }
}

/// One tier's canonical grid points plus the search index built from them.
///
/// Immutable once constructed; the registry only ever replaces whole
/// instances, so an index can never outlive the grid it was built from.
#[derive(Debug)]
pub struct ReferenceGrid {
    tier: ResolutionTier,
    /// Points sorted by gid.
    points: Vec<GridPoint>,
    index: SpatialIndex,
}

impl ReferenceGrid {
    /// Validate points and build the grid together with its index.
    pub fn build(tier: ResolutionTier, mut points: Vec<GridPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(GridIndexError::corrupt(tier, "grid has no points"));
        }

        for p in &points {
            if !p.coordinate().is_valid() {
                return Err(GridIndexError::corrupt(
                    tier,
                    format!("gid {} has out-of-range coordinate ({}, {})", p.gid, p.lat, p.lon),
                ));
            }
        }

        points.sort_unstable_by_key(|p| p.gid);
        if let Some(w) = points.windows(2).find(|w| w[0].gid == w[1].gid) {
            return Err(GridIndexError::corrupt(
                tier,
                format!("duplicate gid {}", w[0].gid),
            ));
        }

        let index = SpatialIndex::build(&points);
        Ok(Self {
            tier,
            points,
            index,
        })
    }

    /// The tier this grid belongs to.
    pub fn tier(&self) -> ResolutionTier {
        self.tier
    }

    /// Number of canonical points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the grid is empty (never true for a built grid).
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Ordered canonical points.
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// Reverse lookup from gid to its canonical point.
    pub fn point(&self, gid: Gid) -> Option<&GridPoint> {
        self.points
            .binary_search_by_key(&gid, |p| p.gid)
            .ok()
            .map(|i| &self.points[i])
    }

    /// Whether a gid belongs to this tier's identifier space.
    pub fn contains(&self, gid: Gid) -> bool {
        self.point(gid).is_some()
    }

    /// Snap a single coordinate to the closest canonical point.
    pub fn nearest(&self, coord: Coordinate) -> Snap {
        match self.index.nearest(coord) {
            Some(snap) => snap,
            // build() rejects empty grids.
            None => unreachable!("reference grid is never empty"),
        }
    }

    /// Snap a batch of coordinates, preserving input order.
    pub fn nearest_batch(&self, coords: &[Coordinate]) -> Vec<Snap> {
        self.index
            .nearest_batch(coords)
            .into_iter()
            .map(|s| match s {
                Some(snap) => snap,
                None => unreachable!("reference grid is never empty"),
            })
            .collect()
    }
}

/// Process-wide, lazily-initialized cache of reference grids.
pub struct RefGridRegistry {
    config: GridSourceConfig,
    tiers: RwLock<HashMap<ResolutionTier, Arc<ReferenceGrid>>>,
}

impl RefGridRegistry {
    /// Create an empty registry; no I/O happens until the first `load`.
    pub fn new(config: GridSourceConfig) -> Self {
        Self {
            config,
            tiers: RwLock::new(HashMap::new()),
        }
    }

    /// Get the grid for a tier, loading and indexing it on first use.
    ///
    /// Idempotent: later calls return the same shared grid without
    /// re-reading the source. The build runs under the write lock, so at
    /// most one build is in flight and readers never observe a partially
    /// built index.
    pub fn load(&self, tier: ResolutionTier) -> Result<Arc<ReferenceGrid>> {
        if let Some(grid) = self.tiers.read().unwrap_or_else(PoisonError::into_inner).get(&tier) {
            return Ok(Arc::clone(grid));
        }

        let mut tiers = self.tiers.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have built the grid while we waited.
        if let Some(grid) = tiers.get(&tier) {
            return Ok(Arc::clone(grid));
        }

        let path = self.config.tier_path(tier);
        tracing::debug!(tier = %tier, path = %path.display(), "building reference grid");
        let points = baked::read_baked(tier, &path)?;
        let grid = Arc::new(ReferenceGrid::build(tier, points)?);
        tiers.insert(tier, Arc::clone(&grid));
        Ok(grid)
    }

    /// Drop a tier's cached grid and index together.
    ///
    /// Subsequent queries lazily rebuild from the source. Existing `Arc`
    /// holders keep their consistent grid+index pair until they drop it.
    pub fn invalidate(&self, tier: ResolutionTier) {
        let removed = self
            .tiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&tier)
            .is_some();
        if removed {
            tracing::debug!(tier = %tier, "invalidated cached reference grid");
        }
    }

    /// The configured grid source.
    pub fn config(&self) -> &GridSourceConfig {
        &self.config
    }

    /// Base directory of the baked sources.
    pub fn baked_dir(&self) -> &Path {
        &self.config.baked_dir
    }
}
