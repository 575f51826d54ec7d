//! Cellular (Worley) noise: distance to the nearest per-cell feature point.

use glam::Vec2;

use super::fractal::sanitize_scale;

#[inline]
fn hash_cell(cx: i32, cy: i32, seed: i32) -> u32 {
    let mut h = (cx as u32).wrapping_mul(0x8da6_b343)
        ^ (cy as u32).wrapping_mul(0xd816_3841)
        ^ (seed as u32).wrapping_mul(0xcb1a_b31f);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    h
}

#[inline]
fn unit_from_bits(bits: u32) -> f32 {
    (bits >> 8) as f32 / (1u32 << 24) as f32
}

/// Feature point of unit cell `(cx, cy)` in scaled space.
#[inline]
fn feature_point(cx: i32, cy: i32, seed: i32) -> Vec2 {
    let h = hash_cell(cx, cy, seed);
    let fx = unit_from_bits(h);
    let fy = unit_from_bits(h.rotate_left(16).wrapping_mul(0x2c1b_3c6d));
    Vec2::new(cx as f32 + fx, cy as f32 + fy)
}

/// Distance from `(x, y)` to the nearest feature point in the surrounding 3×3 cells.
///
/// The distance is measured in cell units at the given `scale` and is not
/// normalized; values fall roughly in `[0, 1.5]`.
pub fn cellular(x: f32, y: f32, scale: f32, seed: i32) -> f32 {
    let scale = sanitize_scale(scale);
    let p = Vec2::new(x / scale, y / scale);
    let cx = p.x.floor() as i32;
    let cy = p.y.floor() as i32;

    let mut nearest = f32::MAX;
    for dy in -1..=1 {
        for dx in -1..=1 {
            let feature = feature_point(cx + dx, cy + dy, seed);
            nearest = nearest.min(p.distance(feature));
        }
    }
    nearest
}
