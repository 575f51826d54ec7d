//! Dominant-biome preview map export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageEncoder;
use thiserror::Error;

use crate::biomes::{dominant_biome_rgb, BiomeDefinition, BiomeWeightField};

/// Errors that can occur during biome map export.
#[derive(Error, Debug)]
pub enum BiomeMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Weight field has {weights} biomes but {definitions} definitions were given")]
    BiomeCountMismatch { weights: usize, definitions: usize },
}

/// Options for biome map export.
#[derive(Debug, Clone)]
pub struct BiomeMapOptions {
    pub compression: CompressionType,
    pub filter: FilterType,
    /// Color for cells where no biome qualifies.
    pub fallback_color: [u8; 3],
}

impl Default for BiomeMapOptions {
    fn default() -> Self {
        Self {
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
            fallback_color: [0, 0, 0],
        }
    }
}

/// Export the dominant biome of every cell as an RGB PNG.
pub fn export_biome_map_png(
    weights: &BiomeWeightField,
    biomes: &[BiomeDefinition],
    path: &Path,
    options: &BiomeMapOptions,
) -> Result<(), BiomeMapError> {
    if weights.biome_count() != biomes.len() {
        return Err(BiomeMapError::BiomeCountMismatch {
            weights: weights.biome_count(),
            definitions: biomes.len(),
        });
    }

    let rgb = dominant_biome_rgb(weights, biomes, options.fallback_color);

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    encoder.write_image(
        &rgb,
        weights.width,
        weights.height,
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biomes::{compute_biome_weights, default_biomes, TransitionConfig};
    use crate::terrain::HeightField;
    use tempfile::tempdir;

    #[test]
    fn test_export_biome_map() {
        let biomes = default_biomes();
        let field = HeightField::filled(8, 4, 0.1).unwrap();
        let weights = compute_biome_weights(
            &field,
            &[1.0; 32],
            &[12.0; 32],
            0.0,
            &biomes,
            &TransitionConfig::default(),
        )
        .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("biomes.png");
        export_biome_map_png(&weights, &biomes, &path, &BiomeMapOptions::default()).unwrap();

        let img = image::open(&path).unwrap().into_rgb8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(3, 2).0, biomes[0].color, "only underwater qualifies at h = 0.1");
    }

    #[test]
    fn test_definition_count_checked() {
        let weights = BiomeWeightField {
            width: 1,
            height: 1,
            biomes: vec!["a".into()],
            weights: vec![1.0],
        };
        let dir = tempdir().unwrap();
        let err = export_biome_map_png(&weights, &default_biomes(), &dir.path().join("x.png"), &BiomeMapOptions::default())
            .unwrap_err();
        assert!(matches!(err, BiomeMapError::BiomeCountMismatch { weights: 1, definitions: 9 }));
    }
}
