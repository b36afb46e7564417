//! Zarr V3 store sessions.
//!
//! A store is a directory of 1-D and 2-D Zarr arrays sharing a row axis:
//! `/gid` (u64 identifiers), `/latitude` and `/longitude` (f64), plus one
//! `rows x periods` f32 array per data variable. Rows only ever grow.
//! Appends write the data arrays first and extend `/gid` last, so a torn
//! append never exposes identifiers whose data rows are missing; a retry
//! computes its offset from the `/gid` length and overwrites the torn tail.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geogrid_common::{Gid, ResolutionTier};
use serde::{Deserialize, Serialize};
use zarrs::array::{Array, ArrayBuilder, DataType, Element, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;
use zarrs_storage::{ReadableStorageTraits, WritableStorageTraits};

use crate::error::{Result, StoreError};
use crate::frame::CanonicalFrame;
use crate::template::StoreTemplate;

const GID_ARRAY: &str = "/gid";
const LATITUDE_ARRAY: &str = "/latitude";
const LONGITUDE_ARRAY: &str = "/longitude";

/// Attribute key on the `/gid` array holding the serialized schema.
const SCHEMA_ATTR: &str = "store_schema";

/// Names a data variable may not use.
const RESERVED_NAMES: [&str; 3] = ["gid", "latitude", "longitude"];

/// Persisted description of a store's layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSchema {
    /// Data variable names.
    pub variables: Vec<String>,
    /// Declared time-axis length; `None` marks a timeless store.
    pub periods: Option<u64>,
    /// Resolution tier whose identifier space keys the rows.
    pub resolution: ResolutionTier,
    /// Rows per chunk along the gid axis.
    pub chunk_rows: u64,
    /// When the store was initialized.
    pub created_at: DateTime<Utc>,
}

impl StoreSchema {
    fn from_template(template: &StoreTemplate) -> Self {
        Self {
            variables: template.variables.clone(),
            periods: template.periods,
            resolution: template.resolution,
            chunk_rows: template.chunk_rows,
            created_at: Utc::now(),
        }
    }

    /// Stored time-axis length (timeless stores hold one sample per row).
    pub fn periods_len(&self) -> u64 {
        self.periods.unwrap_or(1)
    }

    /// Whether the schema declares this variable.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }
}

/// A handle on one store's row axis and data arrays.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// The store's schema.
    fn schema(&self) -> &StoreSchema;

    /// All identifiers currently present, in row order.
    async fn existing_gids(&self) -> Result<Vec<Gid>>;

    /// Append the frame's rows; returns the number of rows written.
    ///
    /// Callers are expected to have filtered out identifiers already
    /// present; this method appends unconditionally.
    async fn append(&self, frame: &CanonicalFrame) -> Result<u64>;

    /// Read one variable's time series for a gid, or `None` if absent.
    async fn read_row(&self, variable: &str, gid: Gid) -> Result<Option<Vec<f32>>>;
}

/// Store session backed by Zarr V3 arrays.
#[derive(Debug)]
pub struct ZarrStoreSession<S: ReadableStorageTraits + WritableStorageTraits + 'static> {
    store: Arc<S>,
    schema: StoreSchema,
}

impl ZarrStoreSession<FilesystemStore> {
    /// Initialize a new store in a directory, which must be empty or absent.
    pub fn create_at(path: &Path, template: &StoreTemplate) -> Result<Self> {
        if path.exists() {
            let mut entries = std::fs::read_dir(path)
                .map_err(|e| StoreError::open_failed(format!("{}: {}", path.display(), e)))?;
            if entries.next().is_some() {
                return Err(StoreError::StoreNotEmpty(path.display().to_string()));
            }
        }
        std::fs::create_dir_all(path)
            .map_err(|e| StoreError::open_failed(format!("{}: {}", path.display(), e)))?;
        let store = FilesystemStore::new(path)
            .map_err(|e| StoreError::open_failed(e.to_string()))?;
        Self::create(store, template)
    }

    /// Open an existing store directory.
    pub fn open_at(path: &Path) -> Result<Self> {
        let store = FilesystemStore::new(path)
            .map_err(|e| StoreError::open_failed(e.to_string()))?;
        Self::open(store)
    }
}

impl<S: ReadableStorageTraits + WritableStorageTraits + Send + Sync + 'static>
    ZarrStoreSession<S>
{
    /// Initialize a new store on the given storage backend.
    pub fn create(storage: S, template: &StoreTemplate) -> Result<Self> {
        template
            .validate()
            .map_err(|m| StoreError::open_failed(format!("invalid template: {}", m)))?;
        for var in &template.variables {
            if RESERVED_NAMES.contains(&var.as_str()) {
                return Err(StoreError::open_failed(format!(
                    "invalid template: '{}' is a reserved array name",
                    var
                )));
            }
        }

        let store = Arc::new(storage);
        if Array::open(store.clone(), GID_ARRAY).is_ok() {
            return Err(StoreError::StoreNotEmpty(
                "a gid array is already present".to_string(),
            ));
        }

        let schema = StoreSchema::from_template(template);
        let session = Self { store, schema };
        let p = session.schema.periods_len();

        session
            .write_gid_metadata(0)
            .map_err(StoreError::open_failed)?;
        for path in [LATITUDE_ARRAY, LONGITUDE_ARRAY] {
            session
                .write_metadata(
                    path,
                    DataType::Float64,
                    FillValue::from(f64::NAN),
                    vec![0],
                    vec![session.schema.chunk_rows],
                )
                .map_err(StoreError::open_failed)?;
        }
        for var in &session.schema.variables {
            session
                .write_metadata(
                    &format!("/{}", var),
                    DataType::Float32,
                    FillValue::from(f32::NAN),
                    vec![0, p],
                    vec![session.schema.chunk_rows, p],
                )
                .map_err(StoreError::open_failed)?;
        }

        tracing::info!(
            variables = session.schema.variables.len(),
            periods = ?session.schema.periods,
            resolution = %session.schema.resolution,
            "initialized empty store"
        );
        Ok(session)
    }

    /// Open an existing store, reading its schema back from the gid array.
    pub fn open(storage: S) -> Result<Self> {
        let store = Arc::new(storage);
        let gid_array = Array::open(store.clone(), GID_ARRAY)
            .map_err(|e| StoreError::open_failed(e.to_string()))?;
        let schema_value = gid_array
            .attributes()
            .get(SCHEMA_ATTR)
            .ok_or_else(|| StoreError::open_failed("gid array has no schema attribute"))?;
        let schema: StoreSchema = serde_json::from_value(schema_value.clone())
            .map_err(|e| StoreError::open_failed(format!("bad schema attribute: {}", e)))?;
        Ok(Self { store, schema })
    }

    fn open_array(&self, path: &str) -> Result<Array<S>> {
        Array::open(self.store.clone(), path)
            .map_err(|e| StoreError::open_failed(format!("{}: {}", path, e)))
    }

    /// Write (or overwrite) one array's metadata document at the given shape.
    ///
    /// Growing the row axis only rewrites metadata; chunk boundaries do not
    /// move, so chunks already on disk stay valid.
    fn write_metadata(
        &self,
        path: &str,
        data_type: DataType,
        fill: FillValue,
        shape: Vec<u64>,
        chunk: Vec<u64>,
    ) -> std::result::Result<Array<S>, String> {
        let chunk_grid: zarrs::array::ChunkGrid =
            chunk.try_into().map_err(|e| format!("{:?}", e))?;
        let builder = ArrayBuilder::new(shape, data_type, chunk_grid, fill);
        let array = builder
            .build(self.store.clone(), path)
            .map_err(|e| e.to_string())?;
        array.store_metadata().map_err(|e| e.to_string())?;
        Ok(array)
    }

    /// Same as `write_metadata` for `/gid`, carrying the schema attribute.
    fn write_gid_metadata(&self, rows: u64) -> std::result::Result<Array<S>, String> {
        let mut attrs = serde_json::Map::new();
        attrs.insert(
            SCHEMA_ATTR.to_string(),
            serde_json::to_value(&self.schema).map_err(|e| e.to_string())?,
        );

        let chunk_grid: zarrs::array::ChunkGrid = vec![self.schema.chunk_rows]
            .try_into()
            .map_err(|e| format!("{:?}", e))?;
        let mut builder = ArrayBuilder::new(
            vec![rows],
            DataType::UInt64,
            chunk_grid,
            FillValue::from(0u64),
        );
        let array = builder
            .attributes(attrs)
            .build(self.store.clone(), GID_ARRAY)
            .map_err(|e| e.to_string())?;
        array.store_metadata().map_err(|e| e.to_string())?;
        Ok(array)
    }

    /// Grow an array to `shape` and write `data` at row offset `start_row`.
    fn grow_and_write<T: Element>(
        &self,
        path: &str,
        data_type: DataType,
        fill: FillValue,
        shape: Vec<u64>,
        chunk: Vec<u64>,
        start_row: u64,
        data: &[T],
    ) -> std::result::Result<(), String> {
        let mut start = vec![0; shape.len()];
        start[0] = start_row;
        let mut write_shape = shape.clone();
        write_shape[0] -= start_row;

        let array = self.write_metadata(path, data_type, fill, shape, chunk)?;
        let subset = ArraySubset::new_with_start_shape(start, write_shape)
            .map_err(|e| e.to_string())?;
        array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl<S: ReadableStorageTraits + WritableStorageTraits + Send + Sync + 'static> StoreSession
    for ZarrStoreSession<S>
{
    fn schema(&self) -> &StoreSchema {
        &self.schema
    }

    async fn existing_gids(&self) -> Result<Vec<Gid>> {
        let array = self.open_array(GID_ARRAY)?;
        let rows = array.shape()[0];
        if rows == 0 {
            return Ok(Vec::new());
        }
        let subset = ArraySubset::new_with_start_shape(vec![0], vec![rows])
            .map_err(|e| StoreError::read_failed(e.to_string()))?;
        array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| StoreError::read_failed(e.to_string()))
    }

    async fn append(&self, frame: &CanonicalFrame) -> Result<u64> {
        let rows = frame.rows();
        if rows == 0 {
            return Ok(0);
        }

        let p = self.schema.periods_len();
        if frame.frame().periods() as u64 != p {
            return Err(StoreError::PeriodsMismatch {
                store: p,
                dataset: frame.frame().periods() as u64,
            });
        }
        for name in frame.frame().variable_names() {
            if !self.schema.has_variable(name) {
                return Err(StoreError::UnknownVariable(name.to_string()));
            }
        }

        let gid_array = self.open_array(GID_ARRAY)?;
        let n_old = gid_array.shape()[0];
        let n_new = n_old + rows as u64;
        let chunk_rows = self.schema.chunk_rows;

        let wrap = |message: String| StoreError::AppendFailed {
            gids: frame.gids().to_vec(),
            message,
        };

        let lats: Vec<f64> = frame.frame().coords().iter().map(|c| c.lat).collect();
        let lons: Vec<f64> = frame.frame().coords().iter().map(|c| c.lon).collect();
        for (path, values) in [(LATITUDE_ARRAY, &lats), (LONGITUDE_ARRAY, &lons)] {
            self.grow_and_write(
                path,
                DataType::Float64,
                FillValue::from(f64::NAN),
                vec![n_new],
                vec![chunk_rows],
                n_old,
                values,
            )
            .map_err(wrap)?;
        }
        // Variables not carried by the frame still grow; their new rows
        // read back as the NaN fill value.
        for var in &self.schema.variables {
            let path = format!("/{}", var);
            match frame.frame().variable(var) {
                Some(values) => self
                    .grow_and_write(
                        &path,
                        DataType::Float32,
                        FillValue::from(f32::NAN),
                        vec![n_new, p],
                        vec![chunk_rows, p],
                        n_old,
                        values,
                    )
                    .map_err(wrap)?,
                None => {
                    self.write_metadata(
                        &path,
                        DataType::Float32,
                        FillValue::from(f32::NAN),
                        vec![n_new, p],
                        vec![chunk_rows, p],
                    )
                    .map_err(wrap)?;
                }
            }
        }

        // The gid array grows last so a torn append leaves the new
        // identifiers unpublished.
        let gid_array = self.write_gid_metadata(n_new).map_err(wrap)?;
        let subset = ArraySubset::new_with_start_shape(vec![n_old], vec![rows as u64])
            .map_err(|e| wrap(e.to_string()))?;
        gid_array
            .store_array_subset_elements(&subset, frame.gids())
            .map_err(|e| wrap(e.to_string()))?;

        tracing::info!(
            rows_written = rows,
            total_rows = n_new,
            "appended rows to store"
        );
        Ok(rows as u64)
    }

    async fn read_row(&self, variable: &str, gid: Gid) -> Result<Option<Vec<f32>>> {
        if !self.schema.has_variable(variable) {
            return Err(StoreError::UnknownVariable(variable.to_string()));
        }
        let gids = self.existing_gids().await?;
        let row = match gids.iter().position(|&g| g == gid) {
            Some(row) => row as u64,
            None => return Ok(None),
        };

        let array = self.open_array(&format!("/{}", variable))?;
        let p = self.schema.periods_len();
        let subset = ArraySubset::new_with_start_shape(vec![row, 0], vec![1, p])
            .map_err(|e| StoreError::read_failed(e.to_string()))?;
        let values: Vec<f32> = array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| StoreError::read_failed(e.to_string()))?;
        Ok(Some(values))
    }
}
