//! Per-run buffers shared by the grid passes.

use rayon::prelude::*;

use crate::climate::ClimateInputs;
use crate::error::{try_zeroed, Result};
use crate::noise::fractal;
use crate::terrain::HeightField;
use super::config::HardnessConfig;

/// Scratch state for one erosion run.
///
/// `erosion` and `sediment` accumulate across passes and are folded into the
/// heightfield only by [`ErosionWorkingSet::commit`].
#[derive(Debug, Clone)]
pub struct ErosionWorkingSet {
    width: u32,
    height: u32,
    pub erosion: Vec<f32>,
    pub sediment: Vec<f32>,
    pub hardness: Vec<f32>,
    pub moisture: Vec<f32>,
    /// Temperature in °C, expanded to one value per cell.
    pub temperature: Vec<f32>,
}

impl ErosionWorkingSet {
    /// Allocates accumulators and copies the climate grids for `field`.
    ///
    /// The caller is expected to have validated `climate` against the field.
    pub fn allocate(
        field: &HeightField,
        climate: &ClimateInputs,
        hardness: &HardnessConfig,
        seed: u64,
    ) -> Result<Self> {
        let cells = field.len();
        let erosion = try_zeroed(cells)?;
        let sediment = try_zeroed(cells)?;

        let mut moisture = try_zeroed(cells)?;
        moisture.copy_from_slice(&climate.moisture);

        let mut temperature = try_zeroed(cells)?;
        temperature
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, t)| *t = climate.temperature.at(i));

        let mut rock = try_zeroed(cells)?;
        fill_hardness(&mut rock, field.width(), hardness, seed);

        Ok(Self {
            width: field.width(),
            height: field.height(),
            erosion,
            sediment,
            hardness: rock,
            moisture,
            temperature,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.erosion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.erosion.is_empty()
    }

    /// Total accumulated erosion and sediment.
    pub fn totals(&self) -> (f64, f64) {
        let eroded = self.erosion.iter().map(|&e| e as f64).sum();
        let deposited = self.sediment.iter().map(|&s| s as f64).sum();
        (eroded, deposited)
    }

    /// Writes `clamp01(h - erosion + sediment)` into every cell.
    pub fn commit(&self, field: &mut HeightField) {
        field
            .data
            .par_iter_mut()
            .zip(self.erosion.par_iter())
            .zip(self.sediment.par_iter())
            .for_each(|((h, &e), &s)| {
                let v = *h - e + s;
                *h = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
            });
    }
}

fn fill_hardness(out: &mut [f32], width: u32, config: &HardnessConfig, seed: u64) {
    let base = config.base.clamp(0.0, 1.0);
    if config.variation == 0.0 {
        out.fill(base);
        return;
    }
    let seed = (seed as i32).wrapping_add(7717);
    let width = width as usize;
    out.par_iter_mut().enumerate().for_each(|(i, v)| {
        let x = (i % width) as f32;
        let y = (i / width) as f32;
        let n = fractal(x, y, 3, 0.5, 2.0, config.scale, seed);
        *v = (base + config.variation * (n - 0.5) * 2.0).clamp(0.0, 1.0);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_hardness_without_variation() {
        let field = HeightField::filled(8, 8, 0.5).unwrap();
        let climate = ClimateInputs::uniform(64, 0.5, 10.0, 1.0, 1.0);
        let hardness = HardnessConfig {
            base: 0.6,
            variation: 0.0,
            scale: 10.0,
        };
        let set = ErosionWorkingSet::allocate(&field, &climate, &hardness, 1).unwrap();
        assert!(set.hardness.iter().all(|&h| h == 0.6));
        assert!(set.erosion.iter().all(|&e| e == 0.0));
        assert_eq!(set.temperature, vec![10.0; 64]);
    }

    #[test]
    fn test_hardness_stays_in_unit_range() {
        let field = HeightField::filled(32, 32, 0.5).unwrap();
        let climate = ClimateInputs::uniform(field.len(), 0.5, 10.0, 1.0, 1.0);
        let hardness = HardnessConfig {
            base: 0.9,
            variation: 0.5,
            scale: 8.0,
        };
        let set = ErosionWorkingSet::allocate(&field, &climate, &hardness, 3).unwrap();
        assert!(set.hardness.iter().all(|h| (0.0..=1.0).contains(h)));
    }

    #[test]
    fn test_commit_applies_and_clamps() {
        let mut field = HeightField::from_vec(2, 1, vec![0.5, 0.05]).unwrap();
        let climate = ClimateInputs::uniform(2, 0.5, 10.0, 1.0, 1.0);
        let mut set =
            ErosionWorkingSet::allocate(&field, &climate, &HardnessConfig::default(), 0).unwrap();
        set.erosion = vec![0.2, 0.1];
        set.sediment = vec![0.05, 0.0];
        set.commit(&mut field);
        assert!((field.data[0] - 0.35).abs() < 1e-6);
        assert_eq!(field.data[1], 0.0);
    }
}
