//! Biome weighting.
//!
//! Each biome scores a cell by height band, moisture and temperature match,
//! and season. Scores are optionally perturbed with cellular noise so
//! transitions are irregular, then normalized per cell.

mod config;
mod weights;

pub use config::{default_biomes, validate_biomes, BiomeConfig, BiomeDefinition, ResponseCurve, TransitionConfig};
pub use weights::{compute_biome_weights, BiomeWeightField};

/// RGB preview for each cell's dominant biome; `fallback` where none qualifies.
pub fn dominant_biome_rgb(weights: &BiomeWeightField, biomes: &[BiomeDefinition], fallback: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(weights.cells() * 3);
    for i in 0..weights.cells() {
        let color = weights
            .dominant(i)
            .and_then(|b| biomes.get(b))
            .map_or(fallback, |def| def.color);
        rgb.extend_from_slice(&color);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::HeightField;

    #[test]
    fn test_preview_uses_fallback_for_uncovered_cells() {
        let biomes = default_biomes();
        let field = HeightField::from_vec(2, 1, vec![0.1, 0.1]).unwrap();
        let mut weights = compute_biome_weights(
            &field,
            &[1.0, 1.0],
            &[12.0, 12.0],
            0.0,
            &biomes,
            &TransitionConfig::disabled(),
        )
        .unwrap();
        weights.weights[9..].iter_mut().for_each(|w| *w = 0.0);

        let rgb = dominant_biome_rgb(&weights, &biomes, [255, 0, 255]);
        assert_eq!(&rgb[0..3], &biomes[0].color, "underwater dominates low wet cells");
        assert_eq!(&rgb[3..6], &[255, 0, 255]);
    }
}
