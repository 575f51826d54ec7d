//! Erosion configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Which backend runs the grid erosion passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErosionBackend {
    /// Prefer GPU; if GPU init fails, fall back to CPU.
    #[default]
    Auto,
    /// Require GPU (fail the run if unavailable).
    GpuOnly,
    /// Force CPU implementation.
    CpuOnly,
}

/// Rate constants for the four accumulating grid passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridErosionConfig {
    /// Number of accumulation sweeps before the result is committed.
    pub iterations: u32,
    /// Simulation step size.
    pub dt: f32,
    /// Hydraulic rate (k1).
    pub hydraulic_rate: f32,
    /// Thermal weathering rate (k2).
    pub thermal_rate: f32,
    /// Wind abrasion rate (k3).
    pub wind_rate: f32,
    /// Chemical dissolution rate (k4).
    pub chemical_rate: f32,
    /// Share of hydraulic erosion redeposited as sediment.
    pub sediment_fraction: f32,
}

impl Default for GridErosionConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            dt: 0.01,
            hydraulic_rate: 0.1,
            thermal_rate: 0.01,
            wind_rate: 0.02,
            chemical_rate: 0.05,
            sediment_fraction: 0.5,
        }
    }
}

impl GridErosionConfig {
    /// True when the passes cannot change any cell.
    pub fn is_noop(&self) -> bool {
        self.iterations == 0
            || self.dt == 0.0
            || (self.hydraulic_rate == 0.0
                && self.thermal_rate == 0.0
                && self.wind_rate == 0.0
                && self.chemical_rate == 0.0)
    }
}

/// Rock hardness field generated for each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardnessConfig {
    /// Mean hardness in [0, 1].
    pub base: f32,
    /// Noise-driven deviation from `base` (0 gives uniform rock).
    pub variation: f32,
    /// Noise feature size in cells.
    pub scale: f32,
}

impl Default for HardnessConfig {
    fn default() -> Self {
        Self {
            base: 0.4,
            variation: 0.3,
            scale: 24.0,
        }
    }
}

/// Droplet physics for particle erosion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Number of particles per run.
    pub count: u32,
    /// Particles simulated against one snapshot before merging.
    pub batch_size: u32,
    /// Step budget per particle.
    pub max_steps: u32,
    /// Simulation step size.
    pub dt: f32,
    /// Viscous damping coefficient (`velocity *= 1 - inertia * dt`).
    pub inertia: f32,
    pub gravity: f32,
    /// Terrain relief in cell units per unit of height.
    pub height_scale: f32,
    /// Capacity coefficient applied to `speed² * water`.
    pub sediment_capacity: f32,
    /// Below this speed a particle carries nothing.
    pub critical_velocity: f32,
    /// Fraction of excess sediment dropped per step.
    pub deposition_rate: f32,
    /// Fraction of water lost per step.
    pub evaporation: f32,
    /// Particles terminate once water drops below this.
    pub min_water: f32,
    /// Velocity retained along the surface normal after a collision.
    pub restitution: f32,
    /// Initial speed in a random direction.
    pub start_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_strength: f32,
    pub max_strength: f32,
    pub min_mineral: f32,
    pub max_mineral: f32,
    /// Spread added to the local climate temperature at spawn (°C).
    pub temperature_jitter_c: f32,
    /// Water volume above which freezing damages rock.
    pub frost_water_threshold: f32,
    pub frost_rate: f32,
    pub chemical_rate: f32,
    /// Scales `ClimateInputs::rainfall` into each particle's rain intensity, clamped to [0, 1].
    pub rain_intensity: f32,
    /// Particles never spawn below this height.
    pub min_spawn_height: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 2000,
            batch_size: 256,
            max_steps: 150,
            dt: 0.1,
            inertia: 0.7,
            gravity: 9.81,
            height_scale: 32.0,
            sediment_capacity: 0.002,
            critical_velocity: 0.25,
            deposition_rate: 0.2,
            evaporation: 0.02,
            min_water: 0.01,
            restitution: 0.5,
            start_speed: 1.0,
            min_radius: 2.0,
            max_radius: 4.0,
            min_strength: 0.1,
            max_strength: 0.3,
            min_mineral: 0.1,
            max_mineral: 1.0,
            temperature_jitter_c: 5.0,
            frost_water_threshold: 0.1,
            frost_rate: 0.01,
            chemical_rate: 0.01,
            rain_intensity: 0.5,
            min_spawn_height: 0.0,
        }
    }
}

/// Neighbor-based slope relaxation run after the particle phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TalusConfig {
    pub iterations: u32,
    /// Height difference tolerated between neighbors before material slides.
    pub talus: f32,
    /// Fraction of the excess moved per iteration (0-1).
    pub strength: f32,
}

impl Default for TalusConfig {
    fn default() -> Self {
        Self {
            iterations: 4,
            talus: 0.02,
            strength: 0.25,
        }
    }
}

/// Parameters for one erosion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Which backend runs the grid passes.
    pub backend: ErosionBackend,
    /// Seed for particle spawning and the hardness field.
    pub seed: u64,
    pub grid: GridErosionConfig,
    pub hardness: HardnessConfig,
    pub particles: ParticleConfig,
    pub talus: TalusConfig,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            backend: ErosionBackend::default(),
            seed: 42,
            grid: GridErosionConfig::default(),
            hardness: HardnessConfig::default(),
            particles: ParticleConfig::default(),
            talus: TalusConfig::default(),
        }
    }
}

impl ErosionConfig {
    /// Zero-strength passes, no particles and no relaxation.
    pub fn disabled() -> Self {
        Self {
            backend: ErosionBackend::CpuOnly,
            grid: GridErosionConfig {
                iterations: 0,
                ..Default::default()
            },
            particles: ParticleConfig {
                count: 0,
                ..Default::default()
            },
            talus: TalusConfig {
                iterations: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// CPU-only configuration.
    pub fn cpu() -> Self {
        Self {
            backend: ErosionBackend::CpuOnly,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.grid;
        if !(g.dt >= 0.0) {
            return Err(TerrainError::invalid("grid.dt", "must be non-negative"));
        }
        if [g.hydraulic_rate, g.thermal_rate, g.wind_rate, g.chemical_rate]
            .iter()
            .any(|k| !k.is_finite() || *k < 0.0)
        {
            return Err(TerrainError::invalid("grid rates", "must be finite and non-negative"));
        }

        let p = &self.particles;
        if p.count > 0 {
            if !(p.dt > 0.0) {
                return Err(TerrainError::invalid("particles.dt", "must be positive"));
            }
            if p.batch_size == 0 {
                return Err(TerrainError::invalid("particles.batch_size", "must be non-zero"));
            }
            if !(0.0..=1.0).contains(&p.evaporation) {
                return Err(TerrainError::invalid("particles.evaporation", "must be in [0, 1]"));
            }
            if !(p.min_water > 0.0) {
                return Err(TerrainError::invalid("particles.min_water", "must be positive"));
            }
            if p.min_radius <= 0.0 || p.max_radius < p.min_radius {
                return Err(TerrainError::invalid("particles.radius", "needs 0 < min <= max"));
            }
            if p.max_strength < p.min_strength || p.max_mineral < p.min_mineral {
                return Err(TerrainError::invalid("particles", "inverted strength or mineral range"));
            }
            if p.critical_velocity <= 0.0 {
                return Err(TerrainError::invalid("particles.critical_velocity", "must be positive"));
            }
        }

        if !(0.0..=1.0).contains(&self.talus.strength) {
            return Err(TerrainError::invalid("talus.strength", "must be in [0, 1]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ErosionConfig::default().validate().is_ok());
        assert!(ErosionConfig::disabled().validate().is_ok());
    }

    #[test]
    fn test_disabled_is_noop() {
        let cfg = ErosionConfig::disabled();
        assert!(cfg.grid.is_noop());
        assert_eq!(cfg.particles.count, 0);
        assert_eq!(cfg.talus.iterations, 0);
    }

    #[test]
    fn test_rejects_negative_rates() {
        let mut cfg = ErosionConfig::default();
        cfg.grid.thermal_rate = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_batch() {
        let mut cfg = ErosionConfig::default();
        cfg.particles.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_backend_serde() {
        let json = serde_json::to_string(&ErosionBackend::CpuOnly).unwrap();
        assert_eq!(json, "\"CpuOnly\"");
    }
}
