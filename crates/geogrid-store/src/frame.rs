//! In-memory location frames.
//!
//! A `LocationFrame` holds the rows a caller wants to persist: one row per
//! physical location, each with a coordinate and a fixed number of time
//! periods per variable. A `CanonicalFrame` is the same data after the
//! spatial index has re-keyed every row by its canonical gid.

use std::collections::BTreeMap;

use geogrid_common::{Coordinate, Gid};
use grid_index::CanonicalBatch;

use crate::error::{Result, StoreError};

/// Rows of gridded time-series data keyed by raw coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFrame {
    coords: Vec<Coordinate>,
    periods: usize,
    /// Variable name -> row-major values of shape rows x periods.
    variables: BTreeMap<String, Vec<f32>>,
}

impl LocationFrame {
    /// Create an empty frame over the given coordinates.
    pub fn new(coords: Vec<Coordinate>, periods: usize) -> Self {
        Self {
            coords,
            periods,
            variables: BTreeMap::new(),
        }
    }

    /// Attach a variable; values must be row-major rows x periods.
    pub fn with_variable(mut self, name: impl Into<String>, values: Vec<f32>) -> Result<Self> {
        let name = name.into();
        let expected = self.rows() * self.periods;
        if values.len() != expected {
            return Err(StoreError::frame_shape(format!(
                "variable '{}' has {} values, expected {} ({} rows x {} periods)",
                name,
                values.len(),
                expected,
                self.rows(),
                self.periods
            )));
        }
        self.variables.insert(name, values);
        Ok(self)
    }

    /// Number of location rows.
    pub fn rows(&self) -> usize {
        self.coords.len()
    }

    /// Declared time-axis length.
    pub fn periods(&self) -> usize {
        self.periods
    }

    /// The raw coordinates, one per row.
    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    /// Variable names in deterministic order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// All values of one variable.
    pub fn variable(&self, name: &str) -> Option<&[f32]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    /// One row of one variable.
    pub fn row(&self, name: &str, row: usize) -> Option<&[f32]> {
        let values = self.variables.get(name)?;
        if row >= self.rows() {
            return None;
        }
        Some(&values[row * self.periods..(row + 1) * self.periods])
    }

    /// Extract the given rows into a new frame, preserving order.
    pub fn select(&self, rows: &[usize]) -> Self {
        let coords = rows.iter().map(|&r| self.coords[r]).collect();
        let variables = self
            .variables
            .iter()
            .map(|(name, values)| {
                let mut selected = Vec::with_capacity(rows.len() * self.periods);
                for &r in rows {
                    selected.extend_from_slice(&values[r * self.periods..(r + 1) * self.periods]);
                }
                (name.clone(), selected)
            })
            .collect();
        Self {
            coords,
            periods: self.periods,
            variables,
        }
    }
}

/// A frame whose rows are keyed by canonical grid identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFrame {
    gids: Vec<Gid>,
    frame: LocationFrame,
}

impl CanonicalFrame {
    /// Pair gids with frame rows 1:1.
    pub fn new(gids: Vec<Gid>, frame: LocationFrame) -> Result<Self> {
        if gids.len() != frame.rows() {
            return Err(StoreError::frame_shape(format!(
                "{} gids for {} rows",
                gids.len(),
                frame.rows()
            )));
        }
        Ok(Self { gids, frame })
    }

    /// Re-key a frame using a canonicalization result, keeping only the
    /// rows that mapped (and survived collapse), in input order.
    pub fn from_batch(frame: &LocationFrame, batch: &CanonicalBatch) -> Result<Self> {
        if batch.snaps.len() != frame.rows() {
            return Err(StoreError::frame_shape(format!(
                "canonical batch covers {} rows but frame has {}",
                batch.snaps.len(),
                frame.rows()
            )));
        }
        let rows = batch.mapped_rows();
        Self::new(batch.gids(), frame.select(&rows))
    }

    /// Canonical identifiers, one per row, in row order.
    pub fn gids(&self) -> &[Gid] {
        &self.gids
    }

    /// The underlying frame.
    pub fn frame(&self) -> &LocationFrame {
        &self.frame
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.gids.len()
    }

    /// Extract the given rows, preserving order.
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            gids: rows.iter().map(|&r| self.gids[r]).collect(),
            frame: self.frame.select(rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> LocationFrame {
        LocationFrame::new(
            vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(0.0, 0.04),
                Coordinate::new(0.0, 0.08),
            ],
            2,
        )
        .with_variable("temp_air", vec![10.0, 11.0, 20.0, 21.0, 30.0, 31.0])
        .unwrap()
    }

    #[test]
    fn test_variable_shape_is_checked() {
        let err = LocationFrame::new(vec![Coordinate::new(0.0, 0.0)], 3)
            .with_variable("ghi", vec![1.0, 2.0])
            .unwrap_err();
        assert!(matches!(err, StoreError::FrameShape(_)));
    }

    #[test]
    fn test_row_access() {
        let frame = sample_frame();
        assert_eq!(frame.row("temp_air", 1).unwrap(), &[20.0, 21.0]);
        assert!(frame.row("temp_air", 3).is_none());
        assert!(frame.row("missing", 0).is_none());
    }

    #[test]
    fn test_select_preserves_order_and_values() {
        let frame = sample_frame();
        let picked = frame.select(&[2, 0]);
        assert_eq!(picked.rows(), 2);
        assert_eq!(picked.coords()[0].lon, 0.08);
        assert_eq!(picked.variable("temp_air").unwrap(), &[30.0, 31.0, 10.0, 11.0]);
    }

    #[test]
    fn test_canonical_frame_length_mismatch() {
        let err = CanonicalFrame::new(vec![1, 2], sample_frame()).unwrap_err();
        assert!(matches!(err, StoreError::FrameShape(_)));
    }
}
