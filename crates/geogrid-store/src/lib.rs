//! Append-only Zarr stores for grid-keyed time series.
//!
//! This crate persists gridded time-series data in Zarr V3 stores whose
//! row axis is keyed by canonical grid identifiers from [`grid_index`].
//! Writes follow a strict protocol:
//!
//! ```text
//! LocationFrame (raw coords)
//!        |
//!        v
//!  canonicalize          snap rows to the store's resolution tier
//!        |
//!        v
//!  prepare_append        drop rows whose gid is already stored
//!        |
//!        v
//!  commit_append         time-axis gate, then append; gid axis last
//! ```
//!
//! Stores are append-only. A gid that is present is never rewritten, so
//! re-running an ingest is a cheap no-op for rows already stored.
//!
//! Named stores live in a YAML registry mapping a name to a path, a
//! declared time-axis length, and a resolution tier; [`ops`] exposes the
//! end-to-end operations over registered stores.

pub mod error;
pub mod frame;
pub mod gate;
pub mod ops;
pub mod registry;
pub mod session;
pub mod template;

pub use error::{Result, StoreError};
pub use frame::{CanonicalFrame, LocationFrame};
pub use gate::{
    commit_append, prepare_append, AppendPlan, AppendResult, RejectReason, RejectedRow,
};
pub use ops::{add_store, open_store, store_frame, StoreReport};
pub use registry::{StoreEntry, StoreRegistry};
pub use session::{StoreSchema, StoreSession, ZarrStoreSession};
pub use template::{tmy_weather_template, StoreTemplate, TMY_HOURLY_PERIODS};
