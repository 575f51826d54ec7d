//! CPU grid passes.

use rayon::prelude::*;

use crate::erosion::backend::{GridEroder, GridPassParams};
use crate::erosion::working_set::ErosionWorkingSet;
use crate::error::Result;

/// Rayon implementation of the grid passes, parallel over rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuGridEroder;

impl GridEroder for CpuGridEroder {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn run(&self, set: &mut ErosionWorkingSet, params: &GridPassParams, iterations: u32) -> Result<()> {
        for _ in 0..iterations {
            hydraulic_pass(set, params);
            thermal_pass(set, params);
            wind_pass(set, params);
            chemical_pass(set, params);
        }
        Ok(())
    }
}

fn row_len(set: &ErosionWorkingSet) -> usize {
    (set.width() as usize).max(1)
}

/// `erosion += rainfall * moisture * k1 * dt`, with part of it returned as sediment.
pub fn hydraulic_pass(set: &mut ErosionWorkingSet, params: &GridPassParams) {
    let w = row_len(set);
    let k = params.rainfall * params.hydraulic_rate * params.dt;
    let fraction = params.sediment_fraction;
    set.erosion
        .par_chunks_mut(w)
        .zip(set.sediment.par_chunks_mut(w))
        .zip(set.moisture.par_chunks(w))
        .for_each(|((erosion, sediment), moisture)| {
            for ((e, s), &m) in erosion.iter_mut().zip(sediment.iter_mut()).zip(moisture) {
                let delta = m * k;
                *e += delta;
                *s += delta * fraction;
            }
        });
}

/// `erosion += max(temperature, 0) * (1 - hardness) * k2 * dt`.
pub fn thermal_pass(set: &mut ErosionWorkingSet, params: &GridPassParams) {
    let w = row_len(set);
    let k = params.thermal_rate * params.dt;
    set.erosion
        .par_chunks_mut(w)
        .zip(set.temperature.par_chunks(w))
        .zip(set.hardness.par_chunks(w))
        .for_each(|((erosion, temperature), hardness)| {
            for ((e, &t), &hard) in erosion.iter_mut().zip(temperature).zip(hardness) {
                *e += t.max(0.0) * (1.0 - hard) * k;
            }
        });
}

/// `erosion += wind_speed * k3 * dt`. Direction does not enter the model.
pub fn wind_pass(set: &mut ErosionWorkingSet, params: &GridPassParams) {
    let w = row_len(set);
    let delta = params.wind_speed * params.wind_rate * params.dt;
    set.erosion.par_chunks_mut(w).for_each(|erosion| {
        for e in erosion {
            *e += delta;
        }
    });
}

/// `erosion += moisture * (1 - hardness) * k4 * dt`.
pub fn chemical_pass(set: &mut ErosionWorkingSet, params: &GridPassParams) {
    let w = row_len(set);
    let k = params.chemical_rate * params.dt;
    set.erosion
        .par_chunks_mut(w)
        .zip(set.moisture.par_chunks(w))
        .zip(set.hardness.par_chunks(w))
        .for_each(|((erosion, moisture), hardness)| {
            for ((e, &m), &hard) in erosion.iter_mut().zip(moisture).zip(hardness) {
                *e += m * (1.0 - hard) * k;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::climate::ClimateInputs;
    use crate::erosion::config::{GridErosionConfig, HardnessConfig};
    use crate::terrain::HeightField;

    fn flat_set(moisture: f32, temperature: f32) -> (HeightField, ErosionWorkingSet, ClimateInputs) {
        let field = HeightField::filled(4, 4, 0.5).unwrap();
        let climate = ClimateInputs::uniform(16, moisture, temperature, 0.0, 1.0);
        let hardness = HardnessConfig {
            base: 0.5,
            variation: 0.0,
            scale: 1.0,
        };
        let set = ErosionWorkingSet::allocate(&field, &climate, &hardness, 0).unwrap();
        (field, set, climate)
    }

    #[test]
    fn test_flat_hydraulic_pass_is_uniform() {
        let (mut field, mut set, climate) = flat_set(0.6, 10.0);
        let config = GridErosionConfig {
            dt: 1.0,
            ..Default::default()
        };
        let params = GridPassParams::new(&set, &config, &climate);
        hydraulic_pass(&mut set, &params);

        let expected = 0.6 * config.hydraulic_rate;
        for (i, &e) in set.erosion.iter().enumerate() {
            assert!((e - expected).abs() < 1e-7, "cell {} erosion {} != moisture * k1", i, e);
        }
        assert!(set.sediment.iter().all(|&s| (s - expected * 0.5).abs() < 1e-7));

        set.commit(&mut field);
        let first = field.data[0];
        assert!(
            field.data.iter().all(|&h| h == first),
            "uniform input must stay uniform after the pass"
        );
        assert!(first < 0.5);
    }

    #[test]
    fn test_thermal_ignores_frozen_cells() {
        let (_, mut set, climate) = flat_set(0.5, -5.0);
        let params = GridPassParams::new(&set, &GridErosionConfig::default(), &climate);
        thermal_pass(&mut set, &params);
        assert!(set.erosion.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn test_harder_rock_erodes_less() {
        let (_, mut set, climate) = flat_set(0.8, 20.0);
        set.hardness[0] = 0.9;
        set.hardness[1] = 0.1;
        let params = GridPassParams::new(&set, &GridErosionConfig::default(), &climate);
        chemical_pass(&mut set, &params);
        thermal_pass(&mut set, &params);
        assert!(set.erosion[0] < set.erosion[1]);
    }

    #[test]
    fn test_wind_pass_is_direction_free() {
        let field = HeightField::filled(3, 2, 0.5).unwrap();
        let climate = ClimateInputs::uniform(6, 0.0, 0.0, 4.0, 0.0);
        let mut set =
            ErosionWorkingSet::allocate(&field, &climate, &HardnessConfig::default(), 0).unwrap();
        let config = GridErosionConfig::default();
        let params = GridPassParams::new(&set, &config, &climate);
        wind_pass(&mut set, &params);
        let expected = 4.0 * config.wind_rate * config.dt;
        assert!(set.erosion.iter().all(|&e| (e - expected).abs() < 1e-7));
    }

    #[test]
    fn test_cpu_eroder_runs_all_passes() {
        let (_, mut set, climate) = flat_set(0.5, 15.0);
        let params = GridPassParams::new(&set, &GridErosionConfig::default(), &climate);
        CpuGridEroder.run(&mut set, &params, 2).unwrap();
        let (eroded, deposited) = set.totals();
        assert!(eroded > 0.0);
        assert!(deposited > 0.0 && deposited < eroded);
    }
}
