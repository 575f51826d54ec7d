//! Configuration for geological feature simulation.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Parameters for fault displacement and volcanic uplift.
///
/// Distances are in normalized domain units (the heightfield spans [0, 1]
/// on each axis) so results do not depend on grid resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeologyConfig {
    /// Number of fault lines to generate.
    pub fault_count: usize,
    /// Upper bound on vertical fault offset (height units).
    pub max_fault_displacement: f32,
    /// Half-width of the band around a fault that gets displaced.
    pub fault_band_width: f32,
    /// Fault segment length range.
    pub min_fault_length: f32,
    pub max_fault_length: f32,

    /// Minimum height of a local maximum to become a hotspot.
    pub volcanic_threshold: f32,
    /// Maximum number of hotspots to claim.
    pub max_hotspots: usize,
    /// Minimum distance between claimed hotspots.
    pub hotspot_spacing: f32,
    /// Peak uplift for a hotspot of full strength.
    pub volcanic_strength: f32,
    /// Gaussian radius of the volcanic cone.
    pub volcano_radius: f32,
    /// Caldera depth as a fraction of hotspot strength (0 disables).
    pub caldera_depth: f32,

    /// Random seed for reproducible generation.
    pub seed: u64,
}

impl Default for GeologyConfig {
    fn default() -> Self {
        Self {
            fault_count: 4,
            max_fault_displacement: 0.06,
            fault_band_width: 0.08,
            min_fault_length: 0.3,
            max_fault_length: 0.9,
            volcanic_threshold: 0.6,
            max_hotspots: 3,
            hotspot_spacing: 0.15,
            volcanic_strength: 0.15,
            volcano_radius: 0.04,
            caldera_depth: 0.3,
            seed: 42,
        }
    }
}

impl GeologyConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Many faults and volcanoes.
    pub fn active(seed: u64) -> Self {
        Self {
            fault_count: 8,
            max_fault_displacement: 0.1,
            max_hotspots: 6,
            volcanic_threshold: 0.5,
            volcanic_strength: 0.2,
            seed,
            ..Default::default()
        }
    }

    /// Few, weak features.
    pub fn stable(seed: u64) -> Self {
        Self {
            fault_count: 1,
            max_fault_displacement: 0.03,
            max_hotspots: 1,
            volcanic_threshold: 0.75,
            volcanic_strength: 0.08,
            seed,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fault_band_width <= 0.0 {
            return Err(TerrainError::invalid("fault_band_width", "must be positive"));
        }
        if self.min_fault_length < 0.0 || self.max_fault_length < self.min_fault_length {
            return Err(TerrainError::invalid(
                "fault_length",
                format!("range [{}, {}] is empty", self.min_fault_length, self.max_fault_length),
            ));
        }
        if self.volcano_radius <= 0.0 {
            return Err(TerrainError::invalid("volcano_radius", "must be positive"));
        }
        if self.max_fault_displacement < 0.0 || self.hotspot_spacing < 0.0 {
            return Err(TerrainError::invalid(
                "geology",
                "displacement and spacing must be non-negative",
            ));
        }
        Ok(())
    }
}
