//! Per-cell biome weights.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::climate::{lerp, season_sin};
use crate::error::{check_len, try_zeroed, Result, TerrainError};
use crate::noise::cellular;
use crate::terrain::HeightField;
use super::config::{validate_biomes, BiomeDefinition, TransitionConfig};

/// Transition noise samples at a tenth of the cell frequency.
const TRANSITION_FREQUENCY: f32 = 0.1;

/// W×H×B weights stored cell-major: the `B` weights of a cell are contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeWeightField {
    pub width: u32,
    pub height: u32,
    /// Biome names, in weight order.
    pub biomes: Vec<String>,
    pub weights: Vec<f32>,
}

impl BiomeWeightField {
    pub fn biome_count(&self) -> usize {
        self.biomes.len()
    }

    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The weights of cell `idx`, one per biome.
    pub fn cell(&self, idx: usize) -> &[f32] {
        let b = self.biome_count();
        &self.weights[idx * b..(idx + 1) * b]
    }

    /// Index of the heaviest biome at `idx`, or `None` when no biome qualifies.
    ///
    /// Ties go to the earlier biome.
    pub fn dominant(&self, idx: usize) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (b, &w) in self.cell(idx).iter().enumerate() {
            if w > 0.0 && best.map_or(true, |(_, bw)| w > bw) {
                best = Some((b, w));
            }
        }
        best.map(|(b, _)| b)
    }

    /// Weight grid for a single biome.
    pub fn layer(&self, biome: usize) -> Vec<f32> {
        self.weights
            .iter()
            .skip(biome)
            .step_by(self.biome_count().max(1))
            .copied()
            .collect()
    }
}

/// Unnormalized suitability of `def` for one cell.
///
/// A biome qualifies inside its height band with moisture and temperature
/// each within `range` of the optimum.
fn base_weight(def: &BiomeDefinition, h: f32, moisture: f32, temperature: f32, seasonal: f32) -> f32 {
    if h < def.min_height || h > def.max_height {
        return 0.0;
    }
    let band = def.max_height - def.min_height;
    let pos = if band > f32::EPSILON { (h - def.min_height) / band } else { 0.0 };
    let height_term = def.height_curve.evaluate(pos).max(0.0);

    let moisture_offset = (moisture - def.moisture_optimum).abs();
    let temperature_offset = (temperature - def.temperature_optimum).abs();
    if moisture_offset > def.moisture_range || temperature_offset > def.temperature_range {
        return 0.0;
    }
    let strictness = 1.0 - def.adaptability;
    let moisture_term = (-moisture_offset * strictness).exp();
    let temperature_term = (-temperature_offset * strictness).exp();

    let seasonal_term = if def.seasonal_variation <= 0.0 {
        1.0
    } else {
        (1.0 + seasonal * def.seasonal_variation).max(0.0)
    };

    height_term * moisture_term * temperature_term * seasonal_term
}

fn perturb(weight: f32, def: &BiomeDefinition, x: f32, y: f32, transitions: &TransitionConfig) -> f32 {
    let n = cellular(
        x * TRANSITION_FREQUENCY,
        y * TRANSITION_FREQUENCY,
        def.blend_distance,
        transitions.seed as i32,
    )
    .clamp(0.0, 1.0);
    lerp(weight, weight * n, transitions.blend_curve.evaluate(n).clamp(0.0, 1.0))
}

/// Weights every biome at every cell and normalizes each cell to sum to 1.
///
/// `temperature` is in °C and `season` is a fraction of the year. Cells where
/// no biome qualifies keep all-zero weights; callers choose the fallback.
pub fn compute_biome_weights(
    field: &HeightField,
    moisture: &[f32],
    temperature: &[f32],
    season: f32,
    biomes: &[BiomeDefinition],
    transitions: &TransitionConfig,
) -> Result<BiomeWeightField> {
    check_len("moisture", field.len(), moisture.len())?;
    check_len("temperature", field.len(), temperature.len())?;
    validate_biomes(biomes)?;
    if !season.is_finite() {
        return Err(TerrainError::invalid("season", "must be finite"));
    }
    transitions.blend_curve.validate()?;

    let count = biomes.len();
    let total = field
        .len()
        .checked_mul(count)
        .ok_or(TerrainError::ResourceExhaustion { cells: usize::MAX })?;
    let mut weights = try_zeroed(total)?;

    let width = field.width() as usize;
    let seasonal = season_sin(season);
    weights
        .par_chunks_mut(count)
        .enumerate()
        .for_each(|(i, cell)| {
            let h = field.data[i];
            let (x, y) = ((i % width) as f32, (i / width) as f32);
            for (w, def) in cell.iter_mut().zip(biomes) {
                let mut weight = base_weight(def, h, moisture[i], temperature[i], seasonal);
                if transitions.enabled && weight > 0.0 {
                    weight = perturb(weight, def, x, y, transitions);
                }
                *w = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
            }

            let sum: f32 = cell.iter().sum();
            if sum > 0.0 {
                cell.iter_mut().for_each(|w| *w /= sum);
            }
        });

    let out = BiomeWeightField {
        width: field.width(),
        height: field.height(),
        biomes: biomes.iter().map(|b| b.name.clone()).collect(),
        weights,
    };
    debug!(
        biomes = count,
        uncovered = (0..out.cells()).filter(|&i| out.dominant(i).is_none()).count(),
        "biome weights computed"
    );
    Ok(out)
}
