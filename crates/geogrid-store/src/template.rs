//! Store initialization templates.
//!
//! A template declares the variables, time-axis length, and resolution
//! tier of a store before any data exists; `add_store` uses it to lay out
//! the empty Zarr arrays.

use geogrid_common::ResolutionTier;
use serde::{Deserialize, Serialize};

/// Hours in a typical meteorological year.
pub const TMY_HOURLY_PERIODS: u64 = 8760;

/// Schema for initializing an empty store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreTemplate {
    /// Data variable names, each stored as a rows x periods f32 array.
    pub variables: Vec<String>,
    /// Declared time-axis length; `None` marks a timeless store.
    pub periods: Option<u64>,
    /// Resolution tier whose identifier space keys the rows.
    pub resolution: ResolutionTier,
    /// Rows per chunk along the gid axis.
    pub chunk_rows: u64,
}

impl StoreTemplate {
    /// Create a template with the default chunking.
    pub fn new(
        variables: Vec<String>,
        periods: Option<u64>,
        resolution: ResolutionTier,
    ) -> Self {
        Self {
            variables,
            periods,
            resolution,
            chunk_rows: 256,
        }
    }

    /// Validate the template.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.variables.is_empty() {
            return Err("template must declare at least one variable".to_string());
        }
        if self.periods == Some(0) {
            return Err("periods must be > 0 when declared".to_string());
        }
        if self.chunk_rows == 0 {
            return Err("chunk_rows must be > 0".to_string());
        }
        let mut seen = std::collections::BTreeSet::new();
        for v in &self.variables {
            if !seen.insert(v) {
                return Err(format!("duplicate variable '{}'", v));
            }
        }
        Ok(())
    }

    /// Stored time-axis length (timeless stores hold one sample per row).
    pub fn periods_len(&self) -> u64 {
        self.periods.unwrap_or(1)
    }
}

/// Hourly typical-meteorological-year weather template.
pub fn tmy_weather_template(resolution: ResolutionTier) -> StoreTemplate {
    StoreTemplate::new(
        [
            "temp_air",
            "relative_humidity",
            "ghi",
            "dni",
            "dhi",
            "wind_speed",
            "wind_direction",
            "pressure",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
        Some(TMY_HOURLY_PERIODS),
        resolution,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmy_template_is_valid() {
        let template = tmy_weather_template(ResolutionTier::Km10);
        assert!(template.validate().is_ok());
        assert_eq!(template.periods_len(), 8760);
        assert_eq!(template.variables.len(), 8);
    }

    #[test]
    fn test_validation_rejects_bad_templates() {
        let empty = StoreTemplate::new(vec![], Some(24), ResolutionTier::Km4);
        assert!(empty.validate().is_err());

        let zero = StoreTemplate::new(vec!["x".into()], Some(0), ResolutionTier::Km4);
        assert!(zero.validate().is_err());

        let dup = StoreTemplate::new(vec!["x".into(), "x".into()], None, ResolutionTier::Km4);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_timeless_template_stores_one_sample() {
        let t = StoreTemplate::new(vec!["altitude".into()], None, ResolutionTier::Km10);
        assert!(t.validate().is_ok());
        assert_eq!(t.periods_len(), 1);
    }
}
