//! Row-major heightfield grid.

use serde::{Deserialize, Serialize};

use crate::error::{try_zeroed, Result, TerrainError};

/// 8-neighborhood offsets in fixed order: N, NE, E, SE, S, SW, W, NW.
///
/// Opposite directions are four entries apart.
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// A W×H grid of normalized heights in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    width: u32,
    height: u32,
    /// Height values stored in row-major order.
    pub data: Vec<f32>,
}

impl HeightField {
    /// Allocates a zero-filled heightfield.
    ///
    /// Fails with `InvalidParameter` for zero dimensions and with
    /// `ResourceExhaustion` when the grid cannot be allocated.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let cells = Self::cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            data: try_zeroed(cells)?,
        })
    }

    /// Creates a heightfield filled with a constant value (clamped to [0, 1]).
    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self> {
        let mut field = Self::new(width, height)?;
        field.data.fill(value.clamp(0.0, 1.0));
        Ok(field)
    }

    /// Wraps existing row-major data.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let cells = Self::cell_count(width, height)?;
        crate::error::check_len("heightfield data", cells, data.len())?;
        Ok(Self { width, height, data })
    }

    fn cell_count(width: u32, height: u32) -> Result<usize> {
        if width == 0 || height == 0 {
            return Err(TerrainError::invalid(
                "dimensions",
                format!("{}x{} has a zero side", width, height),
            ));
        }
        (width as usize)
            .checked_mul(height as usize)
            .ok_or(TerrainError::ResourceExhaustion { cells: usize::MAX })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells (`width * height`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Converts a flat index back to `(x, y)`.
    #[inline]
    pub fn coords(&self, idx: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((idx % w) as u32, (idx / w) as u32)
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Flat index of the neighbor of `idx` in direction `dir`, if on the grid.
    #[inline]
    pub fn neighbor(&self, idx: usize, dir: usize) -> Option<usize> {
        let (x, y) = self.coords(idx);
        let (dx, dy) = NEIGHBORS_8[dir];
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;
        self.in_bounds(nx, ny).then(|| self.index(nx as u32, ny as u32))
    }

    /// True when no on-grid 8-neighbor of `idx` is higher.
    pub fn is_local_max(&self, idx: usize) -> bool {
        let h = self.data[idx];
        (0..NEIGHBORS_8.len()).all(|dir| self.neighbor(idx, dir).map_or(true, |n| self.data[n] <= h))
    }

    /// Returns true when `other` has the same dimensions.
    pub fn same_shape(&self, other: &HeightField) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Bilinear sample at a continuous position, clamped to the grid edges.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = x - x0 as f32;
        let ty = y - y0 as f32;

        let top = self.get(x0, y0) * (1.0 - tx) + self.get(x1, y0) * tx;
        let bottom = self.get(x0, y1) * (1.0 - tx) + self.get(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    /// Clamps every cell into [0, 1]. NaN cells collapse to 0.
    pub fn clamp01(&mut self) {
        for h in &mut self.data {
            *h = if h.is_nan() { 0.0 } else { h.clamp(0.0, 1.0) };
        }
    }

    /// Computes the min and max height values.
    pub fn height_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &h in &self.data {
            min = min.min(h);
            max = max.max(h);
        }
        (min, max)
    }

    /// Sum of all heights in f64, used for mass bookkeeping.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&h| h as f64).sum()
    }
}

/// Height at or below which `coverage` (0..1) of all cells lie.
pub fn sea_level_for_coverage(field: &HeightField, coverage: f32) -> f32 {
    let mut sorted = field.data.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let coverage = coverage.clamp(0.0, 1.0);
    if coverage <= 0.0 {
        return 0.0;
    }
    let idx = ((coverage * sorted.len() as f32).ceil() as usize).clamp(1, sorted.len()) - 1;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_max_allows_plateaus() {
        let mut field = HeightField::filled(3, 3, 0.2).unwrap();
        assert!(field.is_local_max(4), "flat ground counts as a maximum");
        field.set(1, 1, 0.5);
        field.set(2, 2, 0.5);
        assert!(field.is_local_max(4));
        assert!(field.is_local_max(8), "corner cells only see on-grid neighbors");
        field.set(0, 0, 0.6);
        assert!(!field.is_local_max(4));
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        assert!(matches!(
            HeightField::new(0, 4),
            Err(TerrainError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_get_set_row_major() {
        let mut field = HeightField::new(4, 3).unwrap();
        field.set(3, 2, 0.75);
        assert_eq!(field.data[2 * 4 + 3], 0.75);
        assert_eq!(field.get(3, 2), 0.75);
        assert_eq!(field.coords(11), (3, 2));
    }

    #[test]
    fn test_from_vec_checks_length() {
        let err = HeightField::from_vec(4, 4, vec![0.0; 15]).unwrap_err();
        assert!(matches!(err, TerrainError::InvalidDimension { .. }));
    }

    #[test]
    fn test_neighbor_order_and_edges() {
        let field = HeightField::new(3, 3).unwrap();
        let center = field.index(1, 1);
        assert_eq!(field.neighbor(center, 0), Some(field.index(1, 0)));
        assert_eq!(field.neighbor(center, 3), Some(field.index(2, 2)));
        assert_eq!(field.neighbor(0, 7), None);
        assert_eq!(field.neighbor(0, 2), Some(1));
    }

    #[test]
    fn test_clamp01() {
        let mut field = HeightField::from_vec(2, 2, vec![-1.0, 0.5, 2.0, f32::NAN]).unwrap();
        field.clamp01();
        assert_eq!(field.data, vec![0.0, 0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_bilinear_midpoint() {
        let field = HeightField::from_vec(2, 2, vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        assert!((field.sample_bilinear(0.5, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(field.sample_bilinear(-3.0, 0.0), 0.0);
    }

    #[test]
    fn test_sea_level_for_coverage() {
        let data: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let field = HeightField::from_vec(10, 1, data).unwrap();
        let sea = sea_level_for_coverage(&field, 0.3);
        let below = field.data.iter().filter(|&&h| h <= sea).count();
        assert_eq!(below, 3, "30% coverage should put 3 of 10 cells at or below sea level");
    }
}
