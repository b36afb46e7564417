//! Append gating.
//!
//! Stores are append-only: a gid that is present never gets rewritten.
//! `prepare_append` is a pure set-difference planner over the identifiers
//! already in the store; `commit_append` checks the time-axis gate and
//! performs the write. Separating the two keeps the dedup logic testable
//! without touching storage.

use std::collections::HashSet;

use geogrid_common::Gid;

use crate::error::{Result, StoreError};
use crate::frame::CanonicalFrame;
use crate::session::StoreSession;

/// Why a row was excluded from an append plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The store already holds this gid; existing data wins.
    AlreadyPresent,
    /// An earlier row in the same batch carries this gid.
    DuplicateInBatch,
}

/// A row excluded from an append plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Row index in the input frame.
    pub row: usize,
    /// The canonical identifier that collided.
    pub gid: Gid,
    pub reason: RejectReason,
}

/// The outcome of planning an append against the store's current rows.
#[derive(Debug)]
pub struct AppendPlan {
    /// Rows that are genuinely new, in input order.
    pub accepted: CanonicalFrame,
    /// Rows excluded, with the reason.
    pub rejected: Vec<RejectedRow>,
}

/// Result of a committed append.
#[derive(Debug)]
pub struct AppendResult {
    /// Rows actually written.
    pub rows_written: u64,
    /// Rows excluded by the plan.
    pub rejected: Vec<RejectedRow>,
}

/// Split a frame into new rows and rows whose gid is already present.
///
/// `existing` must be a fresh read of the store's identifiers; planning
/// against a stale snapshot can double-write under concurrent appends.
pub fn prepare_append(frame: &CanonicalFrame, existing: &[Gid]) -> AppendPlan {
    let present: HashSet<Gid> = existing.iter().copied().collect();
    let mut seen_in_batch = HashSet::new();

    let mut accepted_rows = Vec::new();
    let mut rejected = Vec::new();
    for (row, &gid) in frame.gids().iter().enumerate() {
        if present.contains(&gid) {
            rejected.push(RejectedRow {
                row,
                gid,
                reason: RejectReason::AlreadyPresent,
            });
        } else if !seen_in_batch.insert(gid) {
            rejected.push(RejectedRow {
                row,
                gid,
                reason: RejectReason::DuplicateInBatch,
            });
        } else {
            accepted_rows.push(row);
        }
    }

    AppendPlan {
        accepted: frame.select(&accepted_rows),
        rejected,
    }
}

/// Commit a plan to the store.
///
/// The declared time-axis length is checked before any storage I/O; a
/// mismatch writes nothing. An empty plan is a successful no-op.
pub async fn commit_append(
    session: &dyn StoreSession,
    declared_periods: Option<u64>,
    plan: AppendPlan,
) -> Result<AppendResult> {
    let expected = declared_periods.unwrap_or(1);
    let dataset = plan.accepted.frame().periods() as u64;
    if dataset != expected {
        return Err(StoreError::PeriodsMismatch {
            store: expected,
            dataset,
        });
    }

    if !plan.rejected.is_empty() {
        tracing::warn!(
            rejected = plan.rejected.len(),
            "skipping rows whose gid is already stored"
        );
    }
    if plan.accepted.rows() == 0 {
        tracing::debug!("append plan has no new rows, nothing to write");
        return Ok(AppendResult {
            rows_written: 0,
            rejected: plan.rejected,
        });
    }

    let rows_written = session.append(&plan.accepted).await?;
    Ok(AppendResult {
        rows_written,
        rejected: plan.rejected,
    })
}
