//! Aggregate configuration for a full terrain run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::biomes::BiomeConfig;
use crate::climate::ClimateConfig;
use crate::erosion::{ErosionConfig, GridErosionConfig, ParticleConfig, TalusConfig};
use crate::error::{Result, TerrainError};
use crate::geology::GeologyConfig;
use crate::rivers::RiverConfig;
use crate::terrain::{LayerWeights, SynthesisConfig};

/// Errors loading or saving a [`TerrainConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] TerrainError),
}

/// Every setting for a run, from synthesis through biome weighting.
///
/// Missing JSON fields take their defaults, inside nested sections too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub seed: u64,
    /// Cells per side.
    pub resolution: u32,
    /// Side length in world units.
    pub world_size: f32,

    pub synthesis: SynthesisConfig,
    pub layers: LayerWeights,
    /// `None` skips the geology pass.
    pub geology: Option<GeologyConfig>,
    pub climate: ClimateConfig,
    pub erosion: ErosionConfig,
    /// `None` skips river building.
    pub rivers: Option<RiverConfig>,
    pub biomes: BiomeConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            resolution: 512,
            world_size: 4096.0,
            synthesis: SynthesisConfig::default(),
            layers: LayerWeights::default(),
            geology: Some(GeologyConfig::default()),
            climate: ClimateConfig::default(),
            erosion: ErosionConfig::default(),
            rivers: Some(RiverConfig::default()),
            biomes: BiomeConfig::default(),
        }
    }
}

impl TerrainConfig {
    /// Sharp ridges, active geology and cold, windy weather.
    pub fn rugged() -> Self {
        let mut erosion = ErosionConfig::default();
        erosion.grid = GridErosionConfig {
            iterations: 3,
            thermal_rate: 0.02,
            wind_rate: 0.04,
            ..Default::default()
        };
        erosion.particles = ParticleConfig {
            count: 4000,
            ..Default::default()
        };
        Self {
            synthesis: SynthesisConfig::rugged(),
            geology: Some(GeologyConfig::active(0)),
            climate: ClimateConfig::alpine(),
            erosion,
            ..Default::default()
        }
    }

    /// Rolling hills with little tectonic activity and heavy slope smoothing.
    pub fn gentle() -> Self {
        let mut erosion = ErosionConfig::default();
        erosion.talus = TalusConfig {
            iterations: 8,
            talus: 0.01,
            ..Default::default()
        };
        Self {
            synthesis: SynthesisConfig::gentle(),
            geology: Some(GeologyConfig::stable(0)),
            erosion,
            ..Default::default()
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "rugged" => Some(Self::rugged()),
            "gentle" => Some(Self::gentle()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(TerrainError::invalid("resolution", "must be non-zero"));
        }
        if !(self.world_size > 0.0) || !self.world_size.is_finite() {
            return Err(TerrainError::invalid("world_size", "must be positive"));
        }
        self.synthesis.validate()?;
        self.layers.validate()?;
        if let Some(geology) = &self.geology {
            geology.validate()?;
        }
        self.climate.validate()?;
        self.erosion.validate()?;
        if let Some(rivers) = &self.rivers {
            rivers.validate()?;
        }
        self.biomes.validate()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> std::result::Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rough peak memory for a run at this resolution.
    pub fn memory_estimate(&self) -> MemoryEstimate {
        let cells = self.resolution as u64 * self.resolution as u64;
        let grid = cells * 4;
        MemoryEstimate {
            cells,
            heightfield_bytes: grid,
            climate_bytes: grid * 2,
            // erosion, sediment, hardness, moisture and temperature
            erosion_working_set_bytes: grid * 5,
            biome_weight_bytes: grid * self.biomes.biomes.len() as u64,
        }
    }
}

/// Byte counts for the main per-cell buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryEstimate {
    pub cells: u64,
    pub heightfield_bytes: u64,
    pub climate_bytes: u64,
    pub erosion_working_set_bytes: u64,
    pub biome_weight_bytes: u64,
}

impl MemoryEstimate {
    /// Buffers alive at the same time during erosion, the largest stage.
    pub fn peak_bytes(&self) -> u64 {
        self.heightfield_bytes
            + self.climate_bytes
            + self.erosion_working_set_bytes.max(self.biome_weight_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for name in ["default", "rugged", "gentle"] {
            let config = TerrainConfig::preset(name).unwrap();
            assert!(config.validate().is_ok(), "preset {} should validate", name);
        }
        assert!(TerrainConfig::preset("volcanic").is_none());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terrain.json");
        let config = TerrainConfig::rugged();
        std::fs::write(&path, config.to_json_string().unwrap()).unwrap();

        let loaded = TerrainConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "seed": 7, "resolution": 64, "rivers": null }"#).unwrap();

        let loaded = TerrainConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.resolution, 64);
        assert!(loaded.rivers.is_none());
        assert_eq!(loaded.biomes, BiomeConfig::default());
    }

    #[test]
    fn test_partial_nested_sections_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.json");
        std::fs::write(
            &path,
            r#"{ "erosion": { "seed": 3, "particles": { "count": 10 } }, "climate": { "season": 0.5 } }"#,
        )
        .unwrap();

        let loaded = TerrainConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.erosion.seed, 3);
        assert_eq!(loaded.erosion.particles.count, 10);
        assert_eq!(loaded.erosion.particles.max_steps, ParticleConfig::default().max_steps);
        assert_eq!(loaded.erosion.grid, GridErosionConfig::default());
        assert_eq!(loaded.climate.season, 0.5);
        assert_eq!(loaded.climate.lapse_rate_c, ClimateConfig::default().lapse_rate_c);
    }

    #[test]
    fn test_invalid_file_contents_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "resolution": 0 }"#).unwrap();
        assert!(matches!(
            TerrainConfig::from_json_file(&path),
            Err(ConfigError::Invalid(TerrainError::InvalidParameter { name: "resolution", .. }))
        ));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(TerrainConfig::from_json_file(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_memory_estimate_scales_with_resolution() {
        let config = TerrainConfig {
            resolution: 256,
            ..Default::default()
        };
        let estimate = config.memory_estimate();
        assert_eq!(estimate.cells, 65_536);
        assert_eq!(estimate.heightfield_bytes, 262_144);
        assert_eq!(estimate.erosion_working_set_bytes, 5 * 262_144);
        assert!(estimate.peak_bytes() > estimate.heightfield_bytes);
    }
}
