//! Resolution tiers for the reference grid.

use serde::{Deserialize, Serialize};

/// Spacing of a precomputed reference grid.
///
/// Each tier owns an independent identifier space: a gid in one tier has
/// no relation to the same numeric gid in another tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionTier {
    /// 10 km x 10 km grid spacing.
    #[serde(rename = "10km")]
    Km10,
    /// 4 km x 4 km grid spacing.
    #[serde(rename = "4km")]
    Km4,
}

impl ResolutionTier {
    /// All supported tiers.
    pub const ALL: [ResolutionTier; 2] = [ResolutionTier::Km10, ResolutionTier::Km4];

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "10km" | "10" => Some(Self::Km10),
            "4km" | "4" => Some(Self::Km4),
            _ => None,
        }
    }

    /// Get the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Km10 => "10km",
            Self::Km4 => "4km",
        }
    }

    /// Nominal grid spacing in kilometers.
    pub fn spacing_km(&self) -> f64 {
        match self {
            Self::Km10 => 10.0,
            Self::Km4 => 4.0,
        }
    }
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
