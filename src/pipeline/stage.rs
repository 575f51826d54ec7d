//! Generation stage trait and pipeline orchestration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use thiserror::Error;
use tracing::{info, info_span};

use crate::biomes::{BiomeDefinition, BiomeWeightField};
use crate::climate::ClimateInputs;
use crate::erosion::ErosionReport;
use crate::error::TerrainError;
use crate::geology::GeologicalFeature;
use crate::rivers::River;
use crate::terrain::HeightField;
use super::config::TerrainConfig;

/// Unique identifier for generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Base heightfield from noise layers.
    Synthesis,
    /// Faults and volcanoes.
    Geology,
    /// Moisture and temperature.
    Climate,
    /// Grid, particle and talus erosion.
    Erosion,
    /// River tracing and carving.
    Rivers,
    /// Biome weighting.
    Biomes,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Synthesis => "synthesis",
            StageId::Geology => "geology",
            StageId::Climate => "climate",
            StageId::Erosion => "erosion",
            StageId::Rivers => "rivers",
            StageId::Biomes => "biomes",
        }
    }
}

/// Settings shared by every stage of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageConfig {
    pub seed: u64,
    pub resolution: u32,
    pub world_size: f32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            resolution: 256,
            world_size: 4096.0,
        }
    }
}

impl StageConfig {
    pub fn from_terrain(config: &TerrainConfig) -> Self {
        Self {
            seed: config.seed,
            resolution: config.resolution,
            world_size: config.world_size,
        }
    }

    /// Seed for a sub-system, decorrelated from the world seed.
    pub fn derive_seed(&self, salt: u64) -> u64 {
        self.seed ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15)
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Missing dependency: stage '{0}' requires '{1}'")]
    MissingDependency(String, String),
    #[error("Cancelled before stage '{0}'")]
    Cancelled(String),
}

impl PipelineError {
    pub(crate) fn failed(stage: &str) -> impl FnOnce(TerrainError) -> PipelineError + '_ {
        move |e| PipelineError::StageFailed(stage.to_string(), e.to_string())
    }
}

/// Everything a run has produced so far.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub heightfield: Option<HeightField>,
    pub features: Vec<GeologicalFeature>,
    pub climate: Option<ClimateInputs>,
    pub sea_level: Option<f32>,
    pub erosion: Option<ErosionReport>,
    pub rivers: Vec<River>,
    /// D8 contributing area per cell, computed after carving.
    pub flow_accumulation: Option<Vec<u32>>,
    pub biomes: Vec<BiomeDefinition>,
    pub biome_weights: Option<BiomeWeightField>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// The heightfield, or a failure naming `stage` if synthesis has not run.
    pub fn heightfield_mut(&mut self, stage: &str) -> Result<&mut HeightField, PipelineError> {
        self.heightfield
            .as_mut()
            .ok_or_else(|| PipelineError::MissingDependency(stage.to_string(), StageId::Synthesis.name().to_string()))
    }

    pub fn heightfield(&self, stage: &str) -> Result<&HeightField, PipelineError> {
        self.heightfield
            .as_ref()
            .ok_or_else(|| PipelineError::MissingDependency(stage.to_string(), StageId::Synthesis.name().to_string()))
    }
}

/// Trait for implementing generation stages.
///
/// Each stage reads what earlier stages left in the [`World`] and adds its
/// own products. Stages run to completion; the boundaries between them are
/// the only points where a run can stop.
pub trait GenerationStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the stage against `world`.
    fn execute(&self, world: &mut World, config: &StageConfig) -> Result<(), PipelineError>;
}

/// Orchestrates multiple generation stages into a complete pipeline.
pub struct Pipeline {
    stages: Vec<Box<dyn GenerationStage>>,
    config: StageConfig,
}

impl Pipeline {
    /// Creates a new empty pipeline with the given configuration.
    pub fn new(config: StageConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Executes all stages in order.
    pub fn run(&self, world: &mut World) -> Result<(), PipelineError> {
        self.run_with_callbacks(world, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages, calling back as each one starts and finishes.
    pub fn run_with_callbacks<F1, F2>(
        &self,
        world: &mut World,
        on_stage_start: F1,
        on_stage_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        self.run_inner(world, None, on_stage_start, on_stage_complete)
    }

    /// Executes stages until `cancel` is set.
    ///
    /// The flag is checked before each stage; a stage that has started always
    /// finishes, so `world` holds only completed stage outputs.
    pub fn run_cancellable(&self, world: &mut World, cancel: &AtomicBool) -> Result<(), PipelineError> {
        self.run_inner(world, Some(cancel), |_, _, _| {}, |_, _, _| {})
    }

    fn run_inner<F1, F2>(
        &self,
        world: &mut World,
        cancel: Option<&AtomicBool>,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(PipelineError::Cancelled(stage.name().to_string()));
            }

            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            on_stage_start(stage.name(), i, total);
            let _span = info_span!("stage", name = stage.id().name()).entered();
            let started = Instant::now();
            stage.execute(world, &self.config)?;
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "{} complete", stage.name());
            completed.push(stage.id());

            on_stage_complete(stage.name(), i, total);
        }

        Ok(())
    }
}
