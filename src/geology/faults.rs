//! Fault-line generation and displacement.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::terrain::HeightField;
use super::config::GeologyConfig;

/// A straight fault segment in normalized [0, 1]² domain coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultLine {
    pub start: Vec2,
    pub end: Vec2,
    /// Signed vertical offset; the left side rises by this amount, the right side sinks.
    pub displacement: f32,
}

impl FaultLine {
    /// Distance from `p` to the segment and the side of the line `p` lies on (+1 or -1).
    pub fn distance_and_side(&self, p: Vec2) -> (f32, f32) {
        let dir = self.end - self.start;
        let len_sq = dir.length_squared();
        let rel = p - self.start;

        let t = if len_sq > 0.0 {
            (rel.dot(dir) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = self.start + dir * t;
        let side = if dir.perp_dot(rel) >= 0.0 { 1.0 } else { -1.0 };
        (p.distance(closest), side)
    }
}

/// Generates `count` faults from `seed`.
pub fn generate_fault_lines(seed: u64, count: usize, config: &GeologyConfig) -> Vec<FaultLine> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_disp = config.max_fault_displacement;

    (0..count)
        .map(|_| {
            let start = Vec2::new(rng.random::<f32>(), rng.random::<f32>());
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let length = if config.max_fault_length > config.min_fault_length {
                rng.random_range(config.min_fault_length..config.max_fault_length)
            } else {
                config.min_fault_length
            };
            let end = start + Vec2::from_angle(angle) * length;
            let displacement = if max_disp > 0.0 {
                rng.random_range(-max_disp..=max_disp)
            } else {
                0.0
            };
            FaultLine {
                start,
                end,
                displacement,
            }
        })
        .collect()
}

/// Raises one side of the fault and lowers the other within `band_width`.
///
/// Offset falls off quadratically with distance from the fault so the scarp is
/// sharpest at the line itself.
pub fn apply_fault_displacement(field: &mut HeightField, fault: &FaultLine, band_width: f32) {
    if band_width <= 0.0 || fault.displacement == 0.0 {
        return;
    }
    let width = field.width() as usize;
    let span_x = (field.width().max(2) - 1) as f32;
    let span_y = (field.height().max(2) - 1) as f32;

    field.data.par_iter_mut().enumerate().for_each(|(i, h)| {
        let p = Vec2::new((i % width) as f32 / span_x, (i / width) as f32 / span_y);
        let (dist, side) = fault.distance_and_side(p);
        if dist < band_width {
            let falloff = 1.0 - dist / band_width;
            *h = (*h + side * fault.displacement * falloff * falloff).clamp(0.0, 1.0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let config = GeologyConfig::default();
        let a = generate_fault_lines(11, 5, &config);
        let b = generate_fault_lines(11, 5, &config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[test]
    fn test_displacement_within_bounds() {
        let config = GeologyConfig::default();
        for fault in generate_fault_lines(3, 32, &config) {
            assert!(fault.displacement.abs() <= config.max_fault_displacement + 1e-6);
            let len = fault.start.distance(fault.end);
            assert!(len >= config.min_fault_length - 1e-4 && len <= config.max_fault_length + 1e-4);
        }
    }

    #[test]
    fn test_fault_raises_one_side_lowers_other() {
        let mut field = HeightField::filled(33, 33, 0.5).unwrap();
        let fault = FaultLine {
            start: Vec2::new(0.5, 0.0),
            end: Vec2::new(0.5, 1.0),
            displacement: 0.1,
        };
        apply_fault_displacement(&mut field, &fault, 0.2);

        let left = field.get(14, 16);
        let right = field.get(18, 16);
        let far = field.get(0, 16);
        assert!(left != right, "cells on opposite sides must move in opposite directions");
        assert!((left - 0.5) * (right - 0.5) < 0.0);
        assert_eq!(far, 0.5, "cells outside the band are untouched");
    }

    #[test]
    fn test_fault_keeps_unit_range() {
        let mut field = HeightField::filled(16, 16, 0.99).unwrap();
        let fault = FaultLine {
            start: Vec2::new(0.0, 0.5),
            end: Vec2::new(1.0, 0.5),
            displacement: 0.5,
        };
        apply_fault_displacement(&mut field, &fault, 0.5);
        assert!(field.data.iter().all(|h| (0.0..=1.0).contains(h)));
    }
}
