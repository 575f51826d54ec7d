//! The built-in generation stages.

use tracing::debug;

use crate::biomes::{compute_biome_weights, BiomeConfig, TransitionConfig};
use crate::climate::{derive_climate, ClimateConfig, ClimateInputs};
use crate::erosion::{ErosionConfig, ErosionEngine};
use crate::geology::{GeologicalSimulator, GeologyConfig};
use crate::rivers::{compute_flow_accumulation, compute_flow_directions, RiverConfig, RiverNetworkBuilder};
use crate::terrain::{HeightfieldSynthesizer, LayerWeights, SynthesisConfig};
use super::stage::{GenerationStage, PipelineError, StageConfig, StageId, World};

const GEOLOGY_SALT: u64 = 1;
const CLIMATE_SALT: u64 = 2;
const EROSION_SALT: u64 = 3;
const BIOME_SALT: u64 = 4;

/// Base heightfield synthesis.
#[derive(Debug, Clone, Default)]
pub struct SynthesisStage {
    pub synthesis: SynthesisConfig,
    pub layers: LayerWeights,
}

impl SynthesisStage {
    pub fn new(synthesis: SynthesisConfig, layers: LayerWeights) -> Self {
        Self { synthesis, layers }
    }
}

impl GenerationStage for SynthesisStage {
    fn id(&self) -> StageId {
        StageId::Synthesis
    }

    fn name(&self) -> &str {
        "Heightfield Synthesis"
    }

    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError> {
        let field = HeightfieldSynthesizer::new(self.synthesis.clone())
            .synthesize(config.resolution, config.world_size, config.seed, &self.layers)
            .map_err(PipelineError::failed(self.name()))?;
        world.heightfield = Some(field);
        Ok(())
    }
}

/// Fault displacement and volcanic uplift.
#[derive(Debug, Clone, Default)]
pub struct GeologyStage {
    pub config: GeologyConfig,
}

impl GeologyStage {
    pub fn new(config: GeologyConfig) -> Self {
        Self { config }
    }
}

impl GenerationStage for GeologyStage {
    fn id(&self) -> StageId {
        StageId::Geology
    }

    fn name(&self) -> &str {
        "Geology"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Synthesis]
    }

    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError> {
        let sim = GeologicalSimulator::new(GeologyConfig {
            seed: self.config.seed ^ config.derive_seed(GEOLOGY_SALT),
            ..self.config.clone()
        });
        let field = world.heightfield_mut(self.name())?;
        let features = sim.simulate(field).map_err(PipelineError::failed(self.name()))?;
        world.features = features;
        Ok(())
    }
}

/// Derived moisture and temperature.
#[derive(Debug, Clone, Default)]
pub struct ClimateStage {
    pub config: ClimateConfig,
}

impl ClimateStage {
    pub fn new(config: ClimateConfig) -> Self {
        Self { config }
    }
}

impl GenerationStage for ClimateStage {
    fn id(&self) -> StageId {
        StageId::Climate
    }

    fn name(&self) -> &str {
        "Climate"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Synthesis]
    }

    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError> {
        let field = world.heightfield(self.name())?;
        let fields = derive_climate(field, &self.config, config.derive_seed(CLIMATE_SALT))
            .map_err(PipelineError::failed(self.name()))?;
        debug!(sea_level = fields.sea_level, "climate derived");
        world.sea_level = Some(fields.sea_level);
        world.climate = Some(ClimateInputs::from_fields(
            &fields,
            self.config.wind_speed,
            self.config.rainfall,
        ));
        Ok(())
    }
}

/// Erosion driven by the climate stage's grids.
#[derive(Debug, Clone, Default)]
pub struct ErosionStage {
    pub config: ErosionConfig,
}

impl ErosionStage {
    pub fn new(config: ErosionConfig) -> Self {
        Self { config }
    }
}

impl GenerationStage for ErosionStage {
    fn id(&self) -> StageId {
        StageId::Erosion
    }

    fn name(&self) -> &str {
        "Erosion"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Synthesis, StageId::Climate]
    }

    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError> {
        let engine = ErosionEngine::new(ErosionConfig {
            seed: self.config.seed ^ config.derive_seed(EROSION_SALT),
            ..self.config.clone()
        });
        let climate = world.climate.take().ok_or_else(|| {
            PipelineError::MissingDependency(self.name().to_string(), StageId::Climate.name().to_string())
        })?;
        let result = world
            .heightfield_mut(self.name())
            .and_then(|field| engine.run(field, &climate).map_err(PipelineError::failed(self.name())));
        world.climate = Some(climate);
        world.erosion = Some(result?);
        Ok(())
    }
}

/// River tracing, carving and flow accumulation.
#[derive(Debug, Clone, Default)]
pub struct RiverStage {
    pub config: RiverConfig,
}

impl RiverStage {
    pub fn new(config: RiverConfig) -> Self {
        Self { config }
    }
}

impl GenerationStage for RiverStage {
    fn id(&self) -> StageId {
        StageId::Rivers
    }

    fn name(&self) -> &str {
        "Rivers"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Synthesis]
    }

    fn execute(&self, world: &mut World, _config: &StageConfig) -> Result<(), PipelineError> {
        // Rivers end at the sea the climate stage chose, when there is one.
        let builder = RiverNetworkBuilder::new(RiverConfig {
            sea_level: world.sea_level.unwrap_or(self.config.sea_level),
            ..self.config.clone()
        });
        let moisture = world.climate.as_ref().map(|c| c.moisture.clone());

        let field = world.heightfield_mut(self.name())?;
        let rivers = match &moisture {
            Some(m) => builder.build(field, m),
            None => builder.build_uniform(field),
        }
        .map_err(PipelineError::failed(self.name()))?;

        let downstream = compute_flow_directions(field);
        let accumulation = compute_flow_accumulation(field, &downstream);
        world.rivers = rivers;
        world.flow_accumulation = Some(accumulation);
        Ok(())
    }
}

/// Per-cell biome weights.
#[derive(Debug, Clone, Default)]
pub struct BiomeStage {
    pub config: BiomeConfig,
}

impl BiomeStage {
    pub fn new(config: BiomeConfig) -> Self {
        Self { config }
    }
}

impl GenerationStage for BiomeStage {
    fn id(&self) -> StageId {
        StageId::Biomes
    }

    fn name(&self) -> &str {
        "Biomes"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Synthesis, StageId::Climate]
    }

    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError> {
        let field = world.heightfield(self.name())?;
        let climate = world.climate.as_ref().ok_or_else(|| {
            PipelineError::MissingDependency(self.name().to_string(), StageId::Climate.name().to_string())
        })?;
        let temperature = climate.temperature.to_grid(field.len());
        let transitions = TransitionConfig {
            seed: self.config.transitions.seed ^ config.derive_seed(BIOME_SALT),
            ..self.config.transitions.clone()
        };
        let weights = compute_biome_weights(
            field,
            &climate.moisture,
            &temperature,
            self.config.season,
            &self.config.biomes,
            &transitions,
        )
        .map_err(PipelineError::failed(self.name()))?;

        world.biomes = self.config.biomes.clone();
        world.biome_weights = Some(weights);
        Ok(())
    }
}
