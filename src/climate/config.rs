//! Climate configuration parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::noise::NoiseLayerConfig;

/// Configuration for the derived moisture/temperature fields.
///
/// Units:
/// - temperatures: °C
/// - elevation: normalized height units
/// - noise scales: cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// Fraction of cells treated as ocean when choosing sea level.
    pub ocean_coverage: f32,
    /// Fixed sea level; overrides `ocean_coverage` when set.
    pub sea_level: Option<f32>,

    // Temperature model
    pub equator_temp_c: f32,
    pub pole_temp_c: f32,
    /// Cooling per unit of height above sea level.
    pub lapse_rate_c: f32,
    /// Fraction of the pole-to-pole arc covered by the map (0..1].
    pub latitude_span: f32,
    /// Season as a fraction of the year [0, 1).
    pub season: f32,
    /// Seasonal temperature swing at the map edges.
    pub seasonality_c: f32,
    /// Amplitude of noise added to temperature.
    pub temperature_jitter_c: f32,

    // Moisture model
    pub moisture_noise: NoiseLayerConfig,
    /// Moisture multiplier at the highest peaks (1 at sea level).
    pub summit_dryness: f32,

    // Weather scalars handed to erosion
    pub wind_speed: f32,
    pub rainfall: f32,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            ocean_coverage: 0.3,
            sea_level: None,
            equator_temp_c: 28.0,
            pole_temp_c: -12.0,
            lapse_rate_c: 40.0,
            latitude_span: 0.5,
            season: 0.0,
            seasonality_c: 8.0,
            temperature_jitter_c: 2.0,
            moisture_noise: NoiseLayerConfig::fractal(3, 0.5, 2.0, 64.0),
            summit_dryness: 0.3,
            wind_speed: 3.0,
            rainfall: 1.0,
        }
    }
}

impl ClimateConfig {
    pub fn temperate() -> Self {
        Self::default()
    }

    /// Cold, dry highlands with frost-driven erosion.
    pub fn alpine() -> Self {
        Self {
            equator_temp_c: 12.0,
            pole_temp_c: -25.0,
            lapse_rate_c: 55.0,
            summit_dryness: 0.2,
            wind_speed: 6.0,
            rainfall: 0.6,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ocean_coverage) {
            return Err(TerrainError::invalid(
                "ocean_coverage",
                format!("{} is outside [0, 1]", self.ocean_coverage),
            ));
        }
        if !(self.latitude_span > 0.0 && self.latitude_span <= 1.0) {
            return Err(TerrainError::invalid("latitude_span", "must be in (0, 1]"));
        }
        if self.wind_speed < 0.0 || self.rainfall < 0.0 {
            return Err(TerrainError::invalid(
                "weather",
                "wind speed and rainfall must be non-negative",
            ));
        }
        Ok(())
    }
}
