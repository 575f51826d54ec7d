//! Volcanic hotspot detection and cone formation.

use glam::{UVec2, Vec2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::noise::fractal;
use crate::terrain::HeightField;

/// A claimed volcanic hotspot in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolcanicHotspot {
    pub position: UVec2,
    /// Peak uplift in height units.
    pub strength: f32,
}

/// Scans for interior local maxima above `threshold` and greedily claims them.
///
/// Candidates are visited from highest to lowest; one within `spacing`
/// (normalized units) of an already claimed hotspot is skipped.
pub fn find_volcanic_hotspots(
    field: &HeightField,
    threshold: f32,
    spacing: f32,
    max_hotspots: usize,
    base_strength: f32,
    seed: i32,
) -> Vec<VolcanicHotspot> {
    let (w, h) = (field.width(), field.height());
    if w < 3 || h < 3 || max_hotspots == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(u32, u32)> = (1..h - 1)
        .flat_map(|y| (1..w - 1).map(move |x| (x, y)))
        .filter(|&(x, y)| field.get(x, y) > threshold && field.is_local_max(field.index(x, y)))
        .collect();

    candidates.sort_by(|a, b| {
        field
            .get(b.0, b.1)
            .total_cmp(&field.get(a.0, a.1))
            .then_with(|| field.index(a.0, a.1).cmp(&field.index(b.0, b.1)))
    });

    let norm = (w.max(h) - 1) as f32;
    let mut claimed: Vec<VolcanicHotspot> = Vec::new();
    for (x, y) in candidates {
        if claimed.len() >= max_hotspots {
            break;
        }
        let cell = Vec2::new(x as f32, y as f32);
        let too_close = claimed
            .iter()
            .any(|c| c.position.as_vec2().distance(cell) / norm < spacing);
        if too_close {
            continue;
        }
        let activity = fractal(x as f32, y as f32, 3, 0.5, 2.0, 32.0, seed);
        claimed.push(VolcanicHotspot {
            position: UVec2::new(x, y),
            strength: base_strength * (0.5 + 0.5 * activity),
        });
    }
    claimed
}

/// Adds a Gaussian cone centered at the hotspot, optionally with a caldera.
///
/// `radius` is the Gaussian sigma as a fraction of the larger grid side;
/// `caldera_depth` is a fraction of the hotspot strength.
pub fn apply_volcanic_formation(
    field: &mut HeightField,
    hotspot: &VolcanicHotspot,
    radius: f32,
    caldera_depth: f32,
) {
    let width = field.width() as usize;
    let sigma = (radius * field.width().max(field.height()) as f32).max(0.5);
    let caldera_sigma = sigma * 0.25;
    let reach_sq = (sigma * 4.0) * (sigma * 4.0);
    let center = hotspot.position.as_vec2();

    field.data.par_iter_mut().enumerate().for_each(|(i, h)| {
        let p = Vec2::new((i % width) as f32, (i / width) as f32);
        let d_sq = p.distance_squared(center);
        if d_sq > reach_sq {
            return;
        }
        let cone = (-d_sq / (2.0 * sigma * sigma)).exp();
        let caldera = (-d_sq / (2.0 * caldera_sigma * caldera_sigma)).exp();
        let uplift = hotspot.strength * (cone - caldera_depth * caldera);
        *h = (*h + uplift).clamp(0.0, 1.0);
    });
}
