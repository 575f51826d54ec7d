//! Derived moisture and temperature grids, plus the inputs handed to erosion.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_len, Result, TerrainError};
use crate::noise::fractal;
use crate::terrain::{sea_level_for_coverage, HeightField};
use super::config::ClimateConfig;
use super::util::{lerp, row_latitude, season_sin};

/// Per-cell climate derived from a heightfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateFields {
    /// Relative moisture in [0, 1].
    pub moisture: Vec<f32>,
    /// Surface temperature in °C.
    pub temperature: Vec<f32>,
    pub sea_level: f32,
}

/// Temperature supplied to erosion, either one value or one per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemperatureInput {
    Uniform(f32),
    Grid(Vec<f32>),
}

impl TemperatureInput {
    #[inline]
    pub fn at(&self, idx: usize) -> f32 {
        match self {
            TemperatureInput::Uniform(t) => *t,
            TemperatureInput::Grid(g) => g[idx],
        }
    }

    /// Expands to one value per cell.
    pub fn to_grid(&self, cells: usize) -> Vec<f32> {
        match self {
            TemperatureInput::Uniform(t) => vec![*t; cells],
            TemperatureInput::Grid(g) => g.clone(),
        }
    }
}

/// Read-only weather inputs for an erosion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateInputs {
    pub moisture: Vec<f32>,
    pub temperature: TemperatureInput,
    pub wind_speed: f32,
    pub rainfall: f32,
}

impl ClimateInputs {
    /// Uniform climate over `cells` cells.
    pub fn uniform(cells: usize, moisture: f32, temperature: f32, wind_speed: f32, rainfall: f32) -> Self {
        Self {
            moisture: vec![moisture; cells],
            temperature: TemperatureInput::Uniform(temperature),
            wind_speed,
            rainfall,
        }
    }

    pub fn from_fields(fields: &ClimateFields, wind_speed: f32, rainfall: f32) -> Self {
        Self {
            moisture: fields.moisture.clone(),
            temperature: TemperatureInput::Grid(fields.temperature.clone()),
            wind_speed,
            rainfall,
        }
    }

    /// Checks every grid against the heightfield's cell count.
    pub fn validate(&self, cells: usize) -> Result<()> {
        check_len("moisture", cells, self.moisture.len())?;
        if let TemperatureInput::Grid(g) = &self.temperature {
            check_len("temperature", cells, g.len())?;
        }
        if !self.wind_speed.is_finite() || !self.rainfall.is_finite() {
            return Err(TerrainError::invalid("climate", "wind speed and rainfall must be finite"));
        }
        Ok(())
    }
}

/// Derives moisture and temperature for every cell of `field`.
pub fn derive_climate(field: &HeightField, config: &ClimateConfig, seed: u64) -> Result<ClimateFields> {
    config.validate()?;

    let sea_level = config
        .sea_level
        .unwrap_or_else(|| sea_level_for_coverage(field, config.ocean_coverage));
    let width = field.width() as usize;
    let height = field.height();
    let moisture_seed = (seed as i32).wrapping_add(4051);
    let jitter_seed = (seed as i32).wrapping_add(9173);
    let seasonal = season_sin(config.season);
    let relief = (1.0 - sea_level).max(f32::EPSILON);

    let (moisture, temperature): (Vec<f32>, Vec<f32>) = field
        .data
        .par_iter()
        .enumerate()
        .map(|(i, &h)| {
            let x = (i % width) as f32;
            let y = (i / width) as u32;

            let above = ((h - sea_level) / relief).max(0.0);
            let moisture = if h <= sea_level {
                1.0
            } else {
                let base = config.moisture_noise.sample(x, y as f32, moisture_seed);
                (base * lerp(1.0, config.summit_dryness, above)).clamp(0.0, 1.0)
            };

            let lat = row_latitude(y, height, config.latitude_span);
            let band = lat.cos() * lat.cos();
            let mut t = lerp(config.pole_temp_c, config.equator_temp_c, band);
            t += config.seasonality_c * seasonal * lat.sin();
            t -= config.lapse_rate_c * (h - sea_level).max(0.0);
            let jitter = fractal(x, y as f32, 2, 0.5, 2.0, 48.0, jitter_seed) - 0.5;
            t += jitter * 2.0 * config.temperature_jitter_c;

            (moisture, t)
        })
        .unzip();

    Ok(ClimateFields {
        moisture,
        temperature,
        sea_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: u32) -> HeightField {
        let data = (0..n * n).map(|i| (i % n) as f32 / (n - 1) as f32).collect();
        HeightField::from_vec(n, n, data).unwrap()
    }

    #[test]
    fn test_fields_match_grid_size() {
        let field = ramp(16);
        let fields = derive_climate(&field, &ClimateConfig::default(), 1).unwrap();
        assert_eq!(fields.moisture.len(), field.len());
        assert_eq!(fields.temperature.len(), field.len());
        assert!(fields.moisture.iter().all(|m| (0.0..=1.0).contains(m)));
    }

    #[test]
    fn test_ocean_cells_are_saturated() {
        let field = ramp(16);
        let config = ClimateConfig {
            sea_level: Some(0.25),
            ..Default::default()
        };
        let fields = derive_climate(&field, &config, 3).unwrap();
        for (i, &h) in field.data.iter().enumerate() {
            if h <= 0.25 {
                assert_eq!(fields.moisture[i], 1.0, "ocean cell {} should be saturated", i);
            }
        }
    }

    #[test]
    fn test_higher_is_colder() {
        let field = ramp(16);
        let config = ClimateConfig {
            temperature_jitter_c: 0.0,
            sea_level: Some(0.0),
            ..Default::default()
        };
        let fields = derive_climate(&field, &config, 3).unwrap();
        let row = 8 * 16;
        assert!(fields.temperature[row + 15] < fields.temperature[row]);
    }

    #[test]
    fn test_inputs_dimension_check() {
        let inputs = ClimateInputs {
            moisture: vec![0.5; 15],
            temperature: TemperatureInput::Uniform(10.0),
            wind_speed: 1.0,
            rainfall: 1.0,
        };
        assert!(matches!(
            inputs.validate(16),
            Err(TerrainError::InvalidDimension { what: "moisture", .. })
        ));

        let inputs = ClimateInputs {
            moisture: vec![0.5; 16],
            temperature: TemperatureInput::Grid(vec![1.0; 4]),
            wind_speed: 1.0,
            rainfall: 1.0,
        };
        assert!(matches!(
            inputs.validate(16),
            Err(TerrainError::InvalidDimension { what: "temperature", .. })
        ));
    }
}
