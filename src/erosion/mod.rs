//! Erosion engine.
//!
//! A run has three phases, each committed before the next starts:
//! grid passes (hydraulic, thermal, wind, chemical) on the CPU or GPU,
//! particle erosion on the CPU, and talus relaxation.

mod backend;
mod config;
pub mod cpu;
pub mod wgpu;
mod working_set;

pub use backend::{select_grid_eroder, GridEroder, GridPassParams};
pub use config::{
    ErosionBackend, ErosionConfig, GridErosionConfig, HardnessConfig, ParticleConfig, TalusConfig,
};
pub use working_set::ErosionWorkingSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::climate::ClimateInputs;
use crate::error::Result;
use crate::terrain::HeightField;

/// What an erosion run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErosionReport {
    /// Grid backend that ran, or `"none"` when the grid phase was skipped.
    pub backend: String,
    pub grid_eroded: f64,
    pub grid_deposited: f64,
    pub particles_spawned: u32,
    pub particles_out_of_bounds: u32,
    pub particle_steps: u64,
    pub particle_eroded: f64,
    pub particle_deposited: f64,
    /// Sediment carried off the grid by particles.
    pub lost_sediment: f64,
    pub talus_moved: f64,
}

/// Runs erosion over a heightfield with externally supplied climate.
#[derive(Debug, Clone, Default)]
pub struct ErosionEngine {
    pub config: ErosionConfig,
}

impl ErosionEngine {
    pub fn new(config: ErosionConfig) -> Self {
        Self { config }
    }

    /// Runs all phases, selecting the grid backend from `config.backend`.
    ///
    /// Inputs are checked before anything is mutated. If a later phase fails,
    /// `field` keeps the last committed state.
    pub fn run(&self, field: &mut HeightField, climate: &ClimateInputs) -> Result<ErosionReport> {
        self.config.validate()?;
        climate.validate(field.len())?;

        if self.config.grid.is_noop() {
            return self.run_phases(field, climate, None);
        }
        let eroder = select_grid_eroder(self.config.backend)?;
        self.run_phases(field, climate, Some(eroder.as_ref()))
    }

    /// Runs all phases with a caller-provided grid backend.
    pub fn run_with(
        &self,
        field: &mut HeightField,
        climate: &ClimateInputs,
        eroder: &dyn GridEroder,
    ) -> Result<ErosionReport> {
        self.config.validate()?;
        climate.validate(field.len())?;
        self.run_phases(field, climate, Some(eroder))
    }

    fn run_phases(
        &self,
        field: &mut HeightField,
        climate: &ClimateInputs,
        eroder: Option<&dyn GridEroder>,
    ) -> Result<ErosionReport> {
        let config = &self.config;
        let mut report = ErosionReport {
            backend: "none".to_string(),
            ..Default::default()
        };

        if let Some(eroder) = eroder.filter(|_| !config.grid.is_noop()) {
            let mut set = ErosionWorkingSet::allocate(field, climate, &config.hardness, config.seed)?;
            let params = GridPassParams::new(&set, &config.grid, climate);
            eroder.run(&mut set, &params, config.grid.iterations)?;
            set.commit(field);

            let (eroded, deposited) = set.totals();
            report.backend = eroder.name().to_string();
            report.grid_eroded = eroded;
            report.grid_deposited = deposited;
            debug!(backend = eroder.name(), eroded, deposited, "Grid passes committed");
        }

        let particles = cpu::run_particles(field, climate, &config.particles, config.seed)?;
        report.particles_spawned = particles.spawned;
        report.particles_out_of_bounds = particles.out_of_bounds;
        report.particle_steps = particles.steps;
        report.particle_eroded = particles.eroded;
        report.particle_deposited = particles.deposited;
        report.lost_sediment = particles.lost_sediment;

        report.talus_moved = cpu::relax_slopes(field, &config.talus)?;

        info!(
            backend = %report.backend,
            grid_eroded = report.grid_eroded,
            particles = report.particles_spawned,
            particle_eroded = report.particle_eroded,
            particle_deposited = report.particle_deposited,
            talus_moved = report.talus_moved,
            "Erosion complete"
        );
        Ok(report)
    }
}
