//! Layered heightfield synthesis from noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TerrainError};
use crate::noise::{ridged, NoiseLayerConfig};
use super::heightfield::HeightField;

/// Relative contribution of each terrain layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub continent: f32,
    pub mountain: f32,
    pub hill: f32,
    pub detail: f32,
    /// Depth of canyon carving at mid elevations.
    pub canyon: f32,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            continent: 0.6,
            mountain: 0.25,
            hill: 0.1,
            detail: 0.05,
            canyon: 0.15,
        }
    }
}

impl LayerWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [self.continent, self.mountain, self.hill, self.detail, self.canyon];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(TerrainError::invalid(
                "layer_weights",
                "weights must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Ridged micro-detail added after all other layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroDetailConfig {
    pub octaves: u32,
    /// Feature size of the first octave in world units.
    pub scale: f32,
    pub strength: f32,
    pub gain: f32,
}

impl Default for MicroDetailConfig {
    fn default() -> Self {
        Self {
            octaves: 3,
            scale: 40.0,
            strength: 0.05,
            gain: 2.0,
        }
    }
}

/// Noise layers and shaping parameters for [`HeightfieldSynthesizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub continents: NoiseLayerConfig,
    pub mountains: NoiseLayerConfig,
    pub hills: NoiseLayerConfig,
    pub details: NoiseLayerConfig,
    pub canyons: NoiseLayerConfig,
    /// Climate proxy layers modulating everything above the continents.
    pub temperature: NoiseLayerConfig,
    pub humidity: NoiseLayerConfig,
    /// Continent elevation above which mountains start to appear.
    pub mountain_threshold: f32,
    /// Sharpens continents into separate landmasses (0 disables).
    pub continent_separation: f32,
    pub temperature_influence: f32,
    pub humidity_influence: f32,
    pub micro_detail: Option<MicroDetailConfig>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            continents: NoiseLayerConfig::fractal(3, 0.5, 2.0, 1200.0),
            mountains: NoiseLayerConfig::ridged(6, 0.6, 2.2, 400.0, 2.5),
            hills: NoiseLayerConfig::fractal(4, 0.5, 2.0, 200.0),
            details: NoiseLayerConfig::fractal(3, 0.5, 2.0, 50.0),
            canyons: NoiseLayerConfig::fractal(2, 0.5, 2.0, 200.0),
            temperature: NoiseLayerConfig::fractal(2, 0.5, 2.0, 800.0),
            humidity: NoiseLayerConfig::fractal(2, 0.5, 2.0, 600.0),
            mountain_threshold: 0.5,
            continent_separation: 0.0,
            temperature_influence: 0.2,
            humidity_influence: 0.1,
            micro_detail: Some(MicroDetailConfig::default()),
        }
    }
}

impl SynthesisConfig {
    /// Sharper mountains and stronger canyons.
    pub fn rugged() -> Self {
        Self {
            mountains: NoiseLayerConfig::ridged(7, 0.65, 2.3, 300.0, 3.0),
            mountain_threshold: 0.4,
            continent_separation: 0.2,
            micro_detail: Some(MicroDetailConfig {
                strength: 0.08,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Rolling terrain with no micro detail.
    pub fn gentle() -> Self {
        Self {
            mountains: NoiseLayerConfig::ridged(4, 0.5, 2.0, 600.0, 1.5),
            mountain_threshold: 0.7,
            micro_detail: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.mountain_threshold) {
            return Err(TerrainError::invalid(
                "mountain_threshold",
                format!("{} is outside [0, 1)", self.mountain_threshold),
            ));
        }
        if !(0.0..1.0).contains(&self.continent_separation) {
            return Err(TerrainError::invalid(
                "continent_separation",
                format!("{} is outside [0, 1)", self.continent_separation),
            ));
        }
        Ok(())
    }
}

/// Per-layer seeds drawn from one seeded generator so layers are decorrelated.
#[derive(Debug, Clone, Copy)]
struct LayerSeeds {
    continent: i32,
    mountain: i32,
    hill: i32,
    detail: i32,
    canyon: i32,
    temperature: i32,
    humidity: i32,
    micro: i32,
}

impl LayerSeeds {
    fn derive(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self {
            continent: rng.random(),
            mountain: rng.random(),
            hill: rng.random(),
            detail: rng.random(),
            canyon: rng.random(),
            temperature: rng.random(),
            humidity: rng.random(),
            micro: rng.random(),
        }
    }
}

#[inline]
fn inverse_lerp(a: f32, b: f32, v: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return if v >= b { 1.0 } else { 0.0 };
    }
    ((v - a) / (b - a)).clamp(0.0, 1.0)
}

/// Composes noise layers into a base heightfield.
#[derive(Debug, Clone, Default)]
pub struct HeightfieldSynthesizer {
    pub config: SynthesisConfig,
}

impl HeightfieldSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Synthesizes a `resolution × resolution` heightfield spanning `world_size` world units.
    pub fn synthesize(
        &self,
        resolution: u32,
        world_size: f32,
        seed: u64,
        weights: &LayerWeights,
    ) -> Result<HeightField> {
        if resolution == 0 {
            return Err(TerrainError::invalid("resolution", "must be non-zero"));
        }
        if !world_size.is_finite() || world_size <= 0.0 {
            return Err(TerrainError::invalid(
                "world_size",
                format!("{} must be positive", world_size),
            ));
        }
        self.config.validate()?;
        weights.validate()?;

        let mut field = HeightField::new(resolution, resolution)?;
        let seeds = LayerSeeds::derive(seed);
        let span = resolution.max(2) - 1;
        let cell_size = world_size / span as f32;
        let res = resolution as usize;

        debug!(resolution, world_size, seed, "synthesizing heightfield");

        field.data.par_iter_mut().enumerate().for_each(|(i, h)| {
            let x = (i % res) as f32 * cell_size;
            let y = (i / res) as f32 * cell_size;
            *h = self.sample(x, y, &seeds, weights);
        });

        Ok(field)
    }

    fn sample(&self, x: f32, y: f32, seeds: &LayerSeeds, weights: &LayerWeights) -> f32 {
        let cfg = &self.config;

        let mut continents = cfg.continents.sample(x, y, seeds.continent);
        if cfg.continent_separation > 0.0 {
            continents = continents.powf(1.0 - cfg.continent_separation);
        }

        let mountain_mask = inverse_lerp(cfg.mountain_threshold, 1.0, continents);
        let mountains = cfg.mountains.sample(x, y, seeds.mountain) * mountain_mask;
        let hills = cfg.hills.sample(x, y, seeds.hill);
        let details = cfg.details.sample(x, y, seeds.detail);

        let temperature = cfg.temperature.sample(x, y, seeds.temperature);
        let humidity = cfg.humidity.sample(x, y, seeds.humidity);
        let modulation = (1.0 + (temperature - 0.5) * cfg.temperature_influence)
            * (1.0 + (humidity - 0.5) * cfg.humidity_influence);

        let mut height = continents * weights.continent
            + (mountains * weights.mountain + hills * weights.hill + details * weights.detail)
                * modulation;

        // Canyons cut hardest through mid elevations and fade toward sea floor and peaks.
        let mid_mask = (1.0 - (height - 0.5).abs() * 2.0).max(0.0);
        height -= cfg.canyons.sample(x, y, seeds.canyon) * mid_mask * weights.canyon;

        if let Some(micro) = &cfg.micro_detail {
            let mut amplitude = 1.0f32;
            let mut frequency = 1.0f32;
            let mut sum = 0.0f32;
            for octave in 0..micro.octaves {
                let s = ridged(
                    x * frequency,
                    y * frequency,
                    1,
                    0.5,
                    2.0,
                    micro.scale,
                    seeds.micro.wrapping_add(octave as i32),
                    micro.gain,
                );
                sum += s * amplitude;
                amplitude *= 0.5;
                frequency *= 2.0;
            }
            height += sum * micro.strength;
        }

        height.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_is_deterministic() {
        let synth = HeightfieldSynthesizer::default();
        let weights = LayerWeights::default();
        let a = synth.synthesize(24, 1000.0, 42, &weights).unwrap();
        let b = synth.synthesize(24, 1000.0, 42, &weights).unwrap();
        let bits_a: Vec<u32> = a.data.iter().map(|h| h.to_bits()).collect();
        let bits_b: Vec<u32> = b.data.iter().map(|h| h.to_bits()).collect();
        assert_eq!(bits_a, bits_b, "identical inputs must give bit-identical heightfields");
    }

    #[test]
    fn test_synthesis_values_in_unit_range() {
        let synth = HeightfieldSynthesizer::new(SynthesisConfig::rugged());
        let field = synth.synthesize(32, 2000.0, 7, &LayerWeights::default()).unwrap();
        assert_eq!(field.len(), 32 * 32);
        for &h in &field.data {
            assert!((0.0..=1.0).contains(&h), "height {} out of [0,1]", h);
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let synth = HeightfieldSynthesizer::default();
        let weights = LayerWeights::default();
        let a = synth.synthesize(16, 1000.0, 1, &weights).unwrap();
        let b = synth.synthesize(16, 1000.0, 2, &weights).unwrap();
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let synth = HeightfieldSynthesizer::default();
        let err = synth.synthesize(0, 1000.0, 1, &LayerWeights::default()).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidParameter { name: "resolution", .. }));
    }

    #[test]
    fn test_rejects_non_positive_world_size() {
        let synth = HeightfieldSynthesizer::default();
        let err = synth.synthesize(8, 0.0, 1, &LayerWeights::default()).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidParameter { name: "world_size", .. }));
    }

    #[test]
    fn test_single_cell_resolution() {
        let synth = HeightfieldSynthesizer::default();
        let field = synth.synthesize(1, 1000.0, 3, &LayerWeights::default()).unwrap();
        assert_eq!(field.len(), 1);
        assert!(field.data[0].is_finite());
    }

    #[test]
    fn test_zero_weights_give_flat_floor() {
        let synth = HeightfieldSynthesizer::new(SynthesisConfig {
            micro_detail: None,
            ..Default::default()
        });
        let weights = LayerWeights {
            continent: 0.0,
            mountain: 0.0,
            hill: 0.0,
            detail: 0.0,
            canyon: 0.0,
        };
        let field = synth.synthesize(8, 500.0, 9, &weights).unwrap();
        assert!(field.data.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = LayerWeights { hill: -0.1, ..Default::default() };
        assert!(weights.validate().is_err());
    }
}
