//! CPU implementations used in the erosion pipeline.

mod grid;
pub mod particle;
mod talus;

pub use grid::{chemical_pass, hydraulic_pass, thermal_pass, wind_pass, CpuGridEroder};
pub use particle::{
    run_particles, simulate_particle, ErosionParticle, LocalTerrain, ParticleState, ParticleSummary,
    ParticleTrace, Termination,
};
pub use talus::relax_slopes;
