//! Procedural terrain synthesis with geological and erosion simulation.
//!
//! A run layers noise into a heightfield, displaces it along faults and
//! raises volcanoes, erodes it with grid passes and water particles, traces
//! rivers, and weights biomes per cell. The free functions below are the
//! entry points; [`pipeline`] composes the same steps into stages.

pub mod biomes;
pub mod climate;
pub mod erosion;
pub mod error;
pub mod export;
pub mod geology;
pub mod noise;
pub mod pipeline;
pub mod rivers;
pub mod terrain;

pub use biomes::{default_biomes, BiomeConfig, BiomeDefinition, BiomeWeightField, ResponseCurve, TransitionConfig};
pub use climate::{ClimateConfig, ClimateInputs, TemperatureInput};
pub use erosion::{ErosionBackend, ErosionConfig, ErosionEngine, ErosionReport};
pub use error::{Result, TerrainError};
pub use geology::{GeologicalFeature, GeologicalSimulator, GeologyConfig};
pub use noise::{NoiseKind, NoiseLayerConfig};
pub use pipeline::{GenerationStage, Pipeline, PipelineError, StageConfig, TerrainConfig, World};
pub use rivers::{River, RiverConfig, RiverNetworkBuilder, RiverPoint};
pub use terrain::{HeightField, HeightfieldSynthesizer};

/// Synthesizes a `resolution × resolution` heightfield and applies geology.
///
/// The synthesis and geology settings come from `config`; its own seed and
/// size are ignored in favor of the arguments. Identical inputs give
/// identical output.
pub fn generate_terrain(seed: u64, resolution: u32, world_size: f32, config: &TerrainConfig) -> Result<HeightField> {
    let mut field = HeightfieldSynthesizer::new(config.synthesis.clone()).synthesize(
        resolution,
        world_size,
        seed,
        &config.layers,
    )?;
    if let Some(geology) = &config.geology {
        GeologicalSimulator::new(GeologyConfig {
            seed: geology.seed ^ seed,
            ..geology.clone()
        })
        .simulate(&mut field)?;
    }
    Ok(field)
}

/// Erodes `field` with externally supplied climate and returns it.
pub fn run_erosion(mut field: HeightField, config: &ErosionConfig, climate: &ClimateInputs) -> Result<HeightField> {
    ErosionEngine::new(config.clone()).run(&mut field, climate)?;
    Ok(field)
}

/// Traces and carves rivers, returning the carved field and the paths.
///
/// Uses the uniform `config.moisture`; see [`RiverNetworkBuilder::build`]
/// for a per-cell moisture grid.
pub fn build_rivers(mut field: HeightField, config: &RiverConfig) -> Result<(HeightField, Vec<River>)> {
    let rivers = RiverNetworkBuilder::new(config.clone()).build_uniform(&mut field)?;
    Ok((field, rivers))
}

/// Weights `biomes` at every cell with the default transition settings.
pub fn compute_biome_weights(
    field: &HeightField,
    moisture: &[f32],
    temperature: &[f32],
    season: f32,
    biomes: &[BiomeDefinition],
) -> Result<BiomeWeightField> {
    biomes::compute_biome_weights(field, moisture, temperature, season, biomes, &TransitionConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TerrainConfig {
        TerrainConfig {
            resolution: 32,
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_terrain_is_deterministic_and_bounded() {
        let config = small();
        let a = generate_terrain(9, 32, 2048.0, &config).unwrap();
        let b = generate_terrain(9, 32, 2048.0, &config).unwrap();
        assert_eq!(a, b, "same seed must give the same terrain");
        assert!(a.data.iter().all(|h| (0.0..=1.0).contains(h)));

        let c = generate_terrain(10, 32, 2048.0, &config).unwrap();
        assert_ne!(a, c, "different seeds should differ");
    }

    #[test]
    fn test_generate_terrain_rejects_zero_resolution() {
        let err = generate_terrain(1, 0, 100.0, &small()).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidParameter { name: "resolution", .. }));
    }

    #[test]
    fn test_entry_points_chain() {
        let field = generate_terrain(3, 32, 2048.0, &small()).unwrap();
        let climate = ClimateInputs::uniform(field.len(), 0.6, 12.0, 2.0, 1.0);
        let mut erosion = ErosionConfig::cpu();
        erosion.particles.count = 50;
        let field = run_erosion(field, &erosion, &climate).unwrap();

        let rivers_config = RiverConfig {
            min_source_height: 0.0,
            ..Default::default()
        };
        let (field, rivers) = build_rivers(field, &rivers_config).unwrap();
        assert!(rivers.iter().all(|r| r.len() <= rivers_config.max_points()));

        let temperature = vec![12.0; field.len()];
        let weights = compute_biome_weights(&field, &climate.moisture, &temperature, 0.5, &default_biomes()).unwrap();
        assert_eq!(weights.cells(), field.len());
        assert!(field.data.iter().all(|h| (0.0..=1.0).contains(h)));
    }
}
