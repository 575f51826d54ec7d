//! River network configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Parameters for source selection, flow tracing and channel carving.
///
/// Distances are in cells unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Number of sources to try to claim.
    pub source_count: usize,
    /// Sources must be local maxima at least this high.
    pub min_source_height: f32,
    /// Minimum distance between sources.
    pub min_source_spacing: f32,

    /// Rivers stop once flow drops below this.
    pub min_river_flow: f32,
    /// Maximum path length, in the same units as `step_size`.
    pub max_river_length: f32,
    /// Length of one cell step.
    pub step_size: f32,
    /// Flow lost to evaporation per unit distance.
    pub evaporation: f32,
    /// Flow lost to infiltration per unit distance on fully dry ground.
    pub infiltration: f32,
    /// Cells at or below this height are standing water.
    pub sea_level: f32,
    /// Moisture assumed when no moisture grid is supplied.
    pub moisture: f32,

    /// Depth carved at each river cell.
    pub channel_depth: f32,
    /// Depth carved in the 8 neighbors of each river cell.
    pub bank_depth: f32,
    /// Half-width of the square deposition area at each terminus.
    pub delta_radius: u32,
    /// Sediment added to each cell of a delta.
    pub delta_deposit: f32,

    /// Contributing area (cells) above which a cell is marked as river.
    pub accumulation_threshold: u32,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            source_count: 10,
            min_source_height: 0.6,
            min_source_spacing: 16.0,
            min_river_flow: 0.1,
            max_river_length: 500.0,
            step_size: 1.0,
            evaporation: 0.002,
            infiltration: 0.004,
            sea_level: 0.3,
            moisture: 0.5,
            channel_depth: 0.01,
            bank_depth: 0.004,
            delta_radius: 2,
            delta_deposit: 0.01,
            accumulation_threshold: 64,
        }
    }
}

impl RiverConfig {
    /// Longest allowed point sequence.
    pub fn max_points(&self) -> usize {
        ((self.max_river_length / self.step_size).floor() as usize).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.step_size > 0.0) {
            return Err(TerrainError::invalid("step_size", "must be positive"));
        }
        if !(self.max_river_length >= self.step_size) {
            return Err(TerrainError::invalid(
                "max_river_length",
                "must cover at least one step",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_river_flow) {
            return Err(TerrainError::invalid("min_river_flow", "must be in [0, 1]"));
        }
        if self.evaporation < 0.0 || self.infiltration < 0.0 {
            return Err(TerrainError::invalid("flow losses", "must be non-negative"));
        }
        if self.channel_depth < 0.0 || self.bank_depth < 0.0 || self.delta_deposit < 0.0 {
            return Err(TerrainError::invalid("carving", "depths must be non-negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RiverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_points(), 500);
    }

    #[test]
    fn test_rejects_zero_step() {
        let config = RiverConfig {
            step_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TerrainError::InvalidParameter { name: "step_size", .. })
        ));
    }
}
