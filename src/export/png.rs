//! PNG export for heightfields and masks.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use thiserror::Error;

use crate::terrain::HeightField;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
    #[error("Data length {found} does not match {width}x{height}")]
    LengthMismatch { width: u32, height: u32, found: usize },
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Height mapped to 0.
    pub min_height: f32,
    /// Height mapped to 65535.
    pub max_height: f32,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Stretches the field's own height range over the full 16 bits.
    pub fn auto_range(field: &HeightField) -> Self {
        let (min, max) = field.height_range();
        Self {
            min_height: min,
            max_height: max,
            ..Default::default()
        }
    }
}

/// Exports a heightfield as a 16-bit grayscale PNG.
pub fn export_heightfield_png(
    field: &HeightField,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_height;
    let max = options.max_height;

    if min >= max {
        return Err(PngExportError::InvalidHeightRange(min, max));
    }

    let range = max - min;
    let img: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(field.width(), field.height(), |x, y| {
            let normalized = ((field.get(x, y) - min) / range).clamp(0.0, 1.0);
            Luma([(normalized * 65535.0) as u16])
        });

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(
        byte_slice,
        field.width(),
        field.height(),
        image::ExtendedColorType::L16,
    )?;

    Ok(())
}

/// Export a byte mask as an 8-bit grayscale PNG.
///
/// `data` must be `width * height` bytes in row-major order.
pub fn export_mask_png_u8(
    width: u32,
    height: u32,
    data: &[u8],
    path: &Path,
) -> Result<(), PngExportError> {
    if data.len() != width as usize * height as usize {
        return Err(PngExportError::LengthMismatch {
            width,
            height,
            found: data.len(),
        });
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, CompressionType::Default, FilterType::Adaptive);
    encoder.write_image(data, width, height, image::ExtendedColorType::L8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(w: u32, h: u32) -> HeightField {
        let data = (0..w * h)
            .map(|i| ((i % w) + (i / w)) as f32 / (w + h - 2) as f32)
            .collect();
        HeightField::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn test_export_heightfield_png() {
        let field = gradient(64, 32);
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.png");

        export_heightfield_png(&field, &path, &PngExportOptions::default()).unwrap();

        let img = image::open(&path).unwrap().into_luma16();
        assert_eq!(img.dimensions(), (64, 32));
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
        assert_eq!(img.get_pixel(63, 31).0[0], 65535);
    }

    #[test]
    fn test_invalid_height_range() {
        let field = gradient(8, 8);
        let dir = tempdir().unwrap();
        let options = PngExportOptions {
            min_height: 1.0,
            max_height: 0.0,
            ..Default::default()
        };
        let result = export_heightfield_png(&field, &dir.path().join("bad.png"), &options);
        assert!(matches!(result, Err(PngExportError::InvalidHeightRange(..))));
    }

    #[test]
    fn test_auto_range() {
        let mut field = HeightField::filled(16, 16, 0.4).unwrap();
        field.set(0, 0, 0.25);
        field.set(15, 15, 0.75);

        let options = PngExportOptions::auto_range(&field);
        assert_eq!(options.min_height, 0.25);
        assert_eq!(options.max_height, 0.75);
    }

    #[test]
    fn test_mask_length_checked() {
        let dir = tempdir().unwrap();
        let result = export_mask_png_u8(4, 4, &[0; 10], &dir.path().join("mask.png"));
        assert!(matches!(result, Err(PngExportError::LengthMismatch { found: 10, .. })));
    }
}
