//! Pipeline module for orchestrating terrain generation stages.
//!
//! Provides a trait-based architecture for modular generation stages
//! that can be composed into a complete terrain pipeline.

mod config;
mod stage;
mod stages;

pub use config::{ConfigError, MemoryEstimate, TerrainConfig};
pub use stage::{GenerationStage, Pipeline, PipelineError, StageConfig, StageId, World};
pub use stages::{BiomeStage, ClimateStage, ErosionStage, GeologyStage, RiverStage, SynthesisStage};

impl Pipeline {
    /// Every stage enabled in `config`, in dependency order.
    pub fn standard(config: &TerrainConfig) -> Self {
        let mut pipeline = Pipeline::new(StageConfig::from_terrain(config));
        pipeline.add_stage(SynthesisStage::new(config.synthesis.clone(), config.layers.clone()));
        if let Some(geology) = &config.geology {
            pipeline.add_stage(GeologyStage::new(geology.clone()));
        }
        pipeline
            .add_stage(ClimateStage::new(config.climate.clone()))
            .add_stage(ErosionStage::new(config.erosion.clone()));
        if let Some(rivers) = &config.rivers {
            pipeline.add_stage(RiverStage::new(rivers.clone()));
        }
        pipeline.add_stage(BiomeStage::new(config.biomes.clone()));
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::erosion::ErosionBackend;

    fn small_config() -> TerrainConfig {
        let mut config = TerrainConfig {
            seed: 11,
            resolution: 48,
            world_size: 1024.0,
            ..Default::default()
        };
        config.erosion.backend = ErosionBackend::CpuOnly;
        config.erosion.particles.count = 100;
        config.erosion.particles.batch_size = 25;
        config
    }

    #[test]
    fn test_stage_id_name() {
        assert_eq!(StageId::Synthesis.name(), "synthesis");
        assert_eq!(StageId::Biomes.name(), "biomes");
    }

    #[test]
    fn test_standard_pipeline_populates_world() {
        let config = small_config();
        let pipeline = Pipeline::standard(&config);
        assert_eq!(pipeline.stage_count(), 6);

        let mut world = World::new();
        pipeline.run(&mut world).unwrap();

        let field = world.heightfield.as_ref().unwrap();
        assert_eq!(field.len(), 48 * 48);
        assert!(field.data.iter().all(|h| (0.0..=1.0).contains(h)), "heights must stay in [0, 1]");
        assert!(world.climate.is_some());
        assert!(world.erosion.is_some());
        assert_eq!(world.flow_accumulation.as_ref().map(Vec::len), Some(field.len()));
        let weights = world.biome_weights.as_ref().unwrap();
        assert_eq!(weights.biome_count(), world.biomes.len());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let config = small_config();
        let mut a = World::new();
        let mut b = World::new();
        Pipeline::standard(&config).run(&mut a).unwrap();
        Pipeline::standard(&config).run(&mut b).unwrap();
        assert_eq!(a.heightfield, b.heightfield);
        assert_eq!(a.rivers, b.rivers);
        assert_eq!(a.biome_weights, b.biome_weights);
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let mut pipeline = Pipeline::new(StageConfig::default());
        pipeline.add_stage(ErosionStage::default());
        let err = pipeline.run(&mut World::new()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDependency(_, dep) if dep == "synthesis"));
    }

    #[test]
    fn test_pipeline_with_callbacks() {
        let mut pipeline = Pipeline::new(StageConfig {
            resolution: 16,
            ..Default::default()
        });
        pipeline.add_stage(SynthesisStage::default());

        let mut started = false;
        let mut completed = false;
        pipeline
            .run_with_callbacks(
                &mut World::new(),
                |name, _, _| {
                    assert_eq!(name, "Heightfield Synthesis");
                    started = true;
                },
                |name, i, total| {
                    assert_eq!(name, "Heightfield Synthesis");
                    assert_eq!((i, total), (0, 1));
                    completed = true;
                },
            )
            .unwrap();
        assert!(started);
        assert!(completed);
    }

    #[test]
    fn test_cancellation_stops_at_stage_boundary() {
        let pipeline = Pipeline::standard(&small_config());
        let cancel = AtomicBool::new(true);
        let mut world = World::new();
        let err = pipeline.run_cancellable(&mut world, &cancel).unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled(_)));
        assert!(world.heightfield.is_none(), "no stage should have run");
    }

    #[test]
    fn test_stage_failure_is_wrapped() {
        let mut pipeline = Pipeline::new(StageConfig {
            resolution: 0,
            ..Default::default()
        });
        pipeline.add_stage(SynthesisStage::default());
        let err = pipeline.run(&mut World::new()).unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed(stage, _) if stage == "Heightfield Synthesis"));
    }
}
