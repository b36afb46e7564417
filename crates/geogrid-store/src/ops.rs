//! High-level store operations.
//!
//! These functions are the crate's main entry points: register and
//! initialize a store, open it by name, and run a location frame through
//! the full write path (canonicalize, dedup against stored gids, append).

use std::path::Path;

use grid_index::{Canonicalizer, RefGridRegistry, SnapOptions, UnmappedRow};
use zarrs_filesystem::FilesystemStore;

use crate::error::{Result, StoreError};
use crate::frame::{CanonicalFrame, LocationFrame};
use crate::gate::{commit_append, prepare_append, RejectReason, RejectedRow};
use crate::registry::{StoreEntry, StoreRegistry};
use crate::session::{StoreSession, ZarrStoreSession};
use crate::template::StoreTemplate;

/// What happened to a frame on its way into a store.
#[derive(Debug)]
pub struct StoreReport {
    /// Rows appended.
    pub rows_written: u64,
    /// Rows skipped because their gid was already stored (or repeated
    /// within the batch).
    pub rejected: Vec<RejectedRow>,
    /// Input rows that mapped to no grid point within the radius limit.
    pub unmapped: Vec<UnmappedRow>,
    /// Input rows dropped because an earlier row snapped to the same gid.
    pub collapsed: Vec<usize>,
}

impl StoreReport {
    /// Rows skipped because the store already held their gid.
    pub fn already_present(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.reason == RejectReason::AlreadyPresent)
            .count()
    }
}

/// Initialize an empty store on disk and register it under a name.
///
/// The target directory must be empty or absent; the registry document is
/// only updated after the store exists.
pub fn add_store(
    registry: &mut StoreRegistry,
    name: &str,
    path: &Path,
    template: &StoreTemplate,
) -> Result<()> {
    ZarrStoreSession::create_at(path, template)?;
    registry.add(
        name,
        StoreEntry {
            path: path.to_path_buf(),
            periods: template.periods,
            resolution: template.resolution,
        },
    )?;
    tracing::info!(store = name, path = %path.display(), "registered new store");
    Ok(())
}

/// Open a registered store by name.
pub fn open_store(
    registry: &StoreRegistry,
    name: &str,
) -> Result<ZarrStoreSession<FilesystemStore>> {
    let entry = registry.get(name)?;
    let session = ZarrStoreSession::open_at(&entry.path)?;
    if session.schema().resolution != entry.resolution {
        return Err(StoreError::InvalidEntry {
            name: name.to_string(),
            message: format!(
                "registry declares {} but store is keyed by {}",
                entry.resolution,
                session.schema().resolution
            ),
        });
    }
    Ok(session)
}

/// Run a frame through the full write path of a named store.
///
/// The declared time-axis length is checked before anything else; rows are
/// then snapped to the store's resolution tier, rows whose gid is already
/// stored are dropped, and the remainder is appended. Existing data is
/// never rewritten.
pub async fn store_frame(
    registry: &StoreRegistry,
    grids: &RefGridRegistry,
    name: &str,
    frame: &LocationFrame,
    opts: &SnapOptions,
) -> Result<StoreReport> {
    let entry = registry.get(name)?;
    let expected = entry.periods.unwrap_or(1);
    if frame.periods() as u64 != expected {
        return Err(StoreError::PeriodsMismatch {
            store: expected,
            dataset: frame.periods() as u64,
        });
    }

    let batch = Canonicalizer::new(grids).canonicalize(entry.resolution, frame.coords(), opts)?;
    let canonical = CanonicalFrame::from_batch(frame, &batch)?;

    let session = open_store(registry, name)?;
    let existing = session.existing_gids().await?;
    let plan = prepare_append(&canonical, &existing);
    let result = commit_append(&session, entry.periods, plan).await?;

    tracing::info!(
        store = name,
        rows_written = result.rows_written,
        rejected = result.rejected.len(),
        unmapped = batch.unmapped.len(),
        "stored frame"
    );
    Ok(StoreReport {
        rows_written: result.rows_written,
        rejected: result.rejected,
        unmapped: batch.unmapped,
        collapsed: batch.collapsed,
    })
}
