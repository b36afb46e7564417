//! Error types for store access and the append-only write path.

use geogrid_common::Gid;
use grid_index::GridIndexError;
use thiserror::Error;

/// Errors that can occur while opening, reading, or appending to a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store or one of its arrays.
    #[error("failed to open store: {0}")]
    OpenFailed(String),

    /// Failed to read data from the store.
    #[error("failed to read store data: {0}")]
    ReadFailed(String),

    /// The underlying persistence layer failed mid-append. Store state is
    /// indeterminate; re-read the existing identifiers before retrying.
    #[error("append failed ({message}); attempted gids {gids:?}")]
    AppendFailed { gids: Vec<Gid>, message: String },

    /// Declared time-axis lengths disagree; nothing was written.
    #[error("dataset has {dataset} periods but store declares {store}")]
    PeriodsMismatch { store: u64, dataset: u64 },

    /// A frame's variables or shapes do not line up.
    #[error("invalid frame: {0}")]
    FrameShape(String),

    /// A frame carries a variable the store schema does not declare.
    #[error("variable '{0}' is not in the store schema")]
    UnknownVariable(String),

    /// Target path already has content; stores are only initialized fresh.
    #[error("path is not empty, refusing to initialize store: {0}")]
    StoreNotEmpty(String),

    /// The named-store registry document could not be read or written.
    #[error("store registry I/O error: {0}")]
    RegistryIo(String),

    /// The named-store registry document could not be parsed.
    #[error("store registry parse error: {0}")]
    RegistryParse(String),

    /// A registry entry failed validation.
    #[error("invalid registry entry '{name}': {message}")]
    InvalidEntry { name: String, message: String },

    /// No registry entry with this name.
    #[error("unknown store: {0}")]
    UnknownStore(String),

    /// Canonicalization or grid loading failed.
    #[error(transparent)]
    Index(#[from] GridIndexError),
}

impl StoreError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a FrameShape error.
    pub fn frame_shape(msg: impl Into<String>) -> Self {
        Self::FrameShape(msg.into())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
