//! Reference Grid Registry and Coordinate Canonicalization
//!
//! This crate maps arbitrary (latitude, longitude) pairs onto a canonical,
//! deduplicated identifier space so that datasets from different sources
//! align on the same spatial keys. It provides:
//!
//! - **Baked grid loading**: per-tier precomputed `(gid, lat, lon)` triples
//!   read from a binary resource, validated on load
//! - **Nearest-neighbor search**: a static kd-tree over unit-sphere
//!   positions with deterministic tie-breaking
//! - **Canonicalization**: batch snapping of raw coordinates to gids with
//!   uniqueness and snap-radius policies
//!
//! # Architecture
//!
//! ```text
//! canonicalize(tier, coords)
//!      │
//!      ├─► RefGridRegistry::load(tier)
//!      │         │
//!      │         ├─► cache hit: shared Arc<ReferenceGrid>
//!      │         │
//!      │         └─► cache miss: read baked file, validate,
//!      │             build kd-tree (grid + index together)
//!      │
//!      ├─► SpatialIndex::nearest_batch (order preserving)
//!      │
//!      └─► uniqueness / snap-radius policy
//!               │
//!               ▼
//!          CanonicalBatch
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_index::{Canonicalizer, GridSourceConfig, RefGridRegistry, SnapOptions};
//! use geogrid_common::{Coordinate, ResolutionTier};
//!
//! let registry = RefGridRegistry::new(GridSourceConfig::new("/data/grid-points-baked"));
//! let canonicalizer = Canonicalizer::new(&registry);
//!
//! let coords = vec![Coordinate::new(39.74, -105.18)];
//! let batch = canonicalizer.canonicalize(
//!     ResolutionTier::Km4,
//!     &coords,
//!     &SnapOptions::default(),
//! )?;
//! ```

pub mod baked;
pub mod canonicalize;
pub mod error;
pub mod kdtree;
pub mod registry;
pub mod testdata;

pub use canonicalize::{CanonicalBatch, Canonicalizer, Snap, SnapOptions, UnmappedRow};
pub use error::{GridIndexError, Result};
pub use kdtree::SpatialIndex;
pub use registry::{GridSourceConfig, RefGridRegistry, ReferenceGrid};
