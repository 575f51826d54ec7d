//! Interchangeable grid-pass backends.

use bytemuck::{Pod, Zeroable};
use tracing::{info, warn};

use crate::climate::ClimateInputs;
use crate::error::Result;
use super::config::{ErosionBackend, GridErosionConfig};
use super::cpu::CpuGridEroder;
use super::wgpu::GpuGridEroder;
use super::working_set::ErosionWorkingSet;

/// Scalars shared by the four grid passes.
///
/// Laid out to match the uniform block of the compute shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridPassParams {
    pub cells: u32,
    pub width: u32,
    pub _pad0: [u32; 2],
    pub rainfall: f32,
    pub wind_speed: f32,
    pub dt: f32,
    pub sediment_fraction: f32,
    pub hydraulic_rate: f32,
    pub thermal_rate: f32,
    pub wind_rate: f32,
    pub chemical_rate: f32,
}

impl GridPassParams {
    pub fn new(set: &ErosionWorkingSet, config: &GridErosionConfig, climate: &ClimateInputs) -> Self {
        Self {
            cells: set.len() as u32,
            width: set.width(),
            _pad0: [0; 2],
            rainfall: climate.rainfall,
            wind_speed: climate.wind_speed,
            dt: config.dt,
            sediment_fraction: config.sediment_fraction,
            hydraulic_rate: config.hydraulic_rate,
            thermal_rate: config.thermal_rate,
            wind_rate: config.wind_rate,
            chemical_rate: config.chemical_rate,
        }
    }
}

/// Repeated sweeps of the hydraulic, thermal, wind and chemical passes.
///
/// Implementations only add to the `erosion`/`sediment` accumulators; the
/// heightfield itself is untouched until the working set is committed.
pub trait GridEroder: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, set: &mut ErosionWorkingSet, params: &GridPassParams, iterations: u32) -> Result<()>;
}

/// Picks the grid backend according to the capability policy.
pub fn select_grid_eroder(backend: ErosionBackend) -> Result<Box<dyn GridEroder>> {
    match backend {
        ErosionBackend::CpuOnly => Ok(Box::new(CpuGridEroder)),
        ErosionBackend::GpuOnly => {
            let gpu = pollster::block_on(GpuGridEroder::new())?;
            info!("Using GPU grid erosion");
            Ok(Box::new(gpu))
        }
        ErosionBackend::Auto => match pollster::block_on(GpuGridEroder::new()) {
            Ok(gpu) => {
                info!("Using GPU grid erosion");
                Ok(Box::new(gpu))
            }
            Err(e) => {
                warn!(error = %e, "GPU erosion unavailable, falling back to CPU");
                Ok(Box::new(CpuGridEroder))
            }
        },
    }
}
