//! RAW export for game engine imports and external tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::biomes::BiomeWeightField;
use crate::terrain::HeightField;

/// Errors that can occur during RAW export.
#[derive(Error, Debug)]
pub enum RawExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidHeightRange(f32, f32),
}

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian (Unity default).
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (high precision).
    R32Float,
}

fn write_f32_le<W: Write>(writer: &mut W, values: &[f32]) -> std::io::Result<()> {
    for &v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Exports a heightfield as RAW, row-major.
///
/// `min_height`/`max_height` map to 0 and 65535 for the 16-bit formats and
/// are ignored for [`RawFormat::R32Float`].
pub fn export_heightfield_raw(
    field: &HeightField,
    path: &Path,
    format: RawFormat,
    min_height: f32,
    max_height: f32,
) -> Result<(), RawExportError> {
    if format != RawFormat::R32Float && min_height >= max_height {
        return Err(RawExportError::InvalidHeightRange(min_height, max_height));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let range = max_height - min_height;
    let quantize = |h: f32| (((h - min_height) / range).clamp(0.0, 1.0) * 65535.0) as u16;

    match format {
        RawFormat::R16LittleEndian => {
            for &height in &field.data {
                writer.write_all(&quantize(height).to_le_bytes())?;
            }
        }
        RawFormat::R16BigEndian => {
            for &height in &field.data {
                writer.write_all(&quantize(height).to_be_bytes())?;
            }
        }
        RawFormat::R32Float => write_f32_le(&mut writer, &field.data)?,
    }

    writer.flush()?;
    Ok(())
}

/// Exports biome weights as little-endian `f32`, cell-major.
///
/// Each cell contributes `biome_count` consecutive values.
pub fn export_biome_weights_raw(weights: &BiomeWeightField, path: &Path) -> Result<(), RawExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_f32_le(&mut writer, &weights.weights)?;
    writer.flush()?;
    Ok(())
}

/// Returns the expected file size for a RAW heightfield export.
pub fn expected_file_size(width: u32, height: u32, format: RawFormat) -> u64 {
    let pixels = (width as u64) * (height as u64);
    match format {
        RawFormat::R16LittleEndian | RawFormat::R16BigEndian => pixels * 2,
        RawFormat::R32Float => pixels * 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_export_raw_file_sizes() {
        let field = HeightField::filled(64, 32, 0.5).unwrap();
        let dir = tempdir().unwrap();

        for format in [RawFormat::R16LittleEndian, RawFormat::R16BigEndian, RawFormat::R32Float] {
            let path = dir.path().join(format!("{:?}.raw", format));
            export_heightfield_raw(&field, &path, format, 0.0, 1.0).unwrap();
            let metadata = std::fs::metadata(&path).unwrap();
            assert_eq!(metadata.len(), expected_file_size(64, 32, format));
        }
    }

    #[test]
    fn test_raw_content_correctness() {
        let field = HeightField::from_vec(2, 2, vec![0.0, 0.5, 0.25, 1.0]).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.raw");

        export_heightfield_raw(&field, &path, RawFormat::R16LittleEndian, 0.0, 1.0).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 8); // 4 pixels × 2 bytes
        assert_eq!(u16::from_le_bytes([data[0], data[1]]), 0);
        let mid = u16::from_le_bytes([data[2], data[3]]);
        assert!((mid as i32 - 32767).abs() < 2);
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 65535);
    }

    #[test]
    fn test_r32_preserves_values() {
        let field = HeightField::from_vec(3, 1, vec![0.1, 0.2, 0.3]).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("f32.raw");
        export_heightfield_raw(&field, &path, RawFormat::R32Float, 0.0, 0.0).unwrap();

        let data = std::fs::read(&path).unwrap();
        let back: Vec<f32> = data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(back, field.data);
    }

    #[test]
    fn test_biome_weights_layout() {
        let weights = BiomeWeightField {
            width: 2,
            height: 1,
            biomes: vec!["a".into(), "b".into()],
            weights: vec![1.0, 0.0, 0.25, 0.75],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.raw");
        export_biome_weights_raw(&weights, &path).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(f32::from_le_bytes([data[12], data[13], data[14], data[15]]), 0.75);
    }

    #[test]
    fn test_invalid_range_for_r16() {
        let field = HeightField::filled(2, 2, 0.5).unwrap();
        let dir = tempdir().unwrap();
        let result = export_heightfield_raw(&field, &dir.path().join("x.raw"), RawFormat::R16BigEndian, 1.0, 1.0);
        assert!(matches!(result, Err(RawExportError::InvalidHeightRange(..))));
    }
}
