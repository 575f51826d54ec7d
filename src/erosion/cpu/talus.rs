//! Thermal slope relaxation (talus redistribution).

use rayon::prelude::*;

use crate::erosion::config::TalusConfig;
use crate::error::{Result, TerrainError};
use crate::terrain::{HeightField, NEIGHBORS_8};

/// Moves material above the talus threshold to lower 8-neighbors, in
/// proportion to each neighbor's excess drop.
///
/// Mass-conserving before the final clamp. Returns the total height moved.
pub fn relax_slopes(field: &mut HeightField, config: &TalusConfig) -> Result<f64> {
    if config.iterations == 0 || config.strength <= 0.0 {
        return Ok(0.0);
    }
    let cells = field.len();
    let mut outflow: Vec<[f32; 8]> = Vec::new();
    outflow
        .try_reserve_exact(cells)
        .map_err(|_| TerrainError::ResourceExhaustion { cells })?;
    outflow.resize(cells, [0.0; 8]);

    let strength = config.strength.clamp(0.0, 1.0);
    let mut moved = 0.0f64;

    for _ in 0..config.iterations {
        // Each cell decides what it sends to each neighbor.
        let heights = &*field;
        outflow.par_iter_mut().enumerate().for_each(|(i, out)| {
            *out = [0.0; 8];
            let h0 = heights.data[i];
            let mut excess = [0.0f32; 8];
            let mut total = 0.0;
            let mut steepest = 0.0f32;
            for (dir, &(dx, dy)) in NEIGHBORS_8.iter().enumerate() {
                let Some(n) = heights.neighbor(i, dir) else {
                    continue;
                };
                let dist = if dx != 0 && dy != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
                let e = h0 - heights.data[n] - config.talus * dist;
                if e > 0.0 {
                    excess[dir] = e;
                    total += e;
                    steepest = steepest.max(e);
                }
            }
            if total <= 0.0 {
                return;
            }
            let amount = 0.5 * strength * steepest;
            for dir in 0..8 {
                out[dir] = amount * excess[dir] / total;
            }
        });

        // Gather: each cell loses its own outflow and receives its neighbors'.
        let outflow_ref = &outflow;
        let shape = &*field;
        let next: Vec<f32> = (0..cells)
            .into_par_iter()
            .map(|i| {
                let mut h = shape.data[i] - outflow_ref[i].iter().sum::<f32>();
                for dir in 0..8 {
                    if let Some(n) = shape.neighbor(i, dir) {
                        h += outflow_ref[n][(dir + 4) % 8];
                    }
                }
                h
            })
            .collect();

        moved += outflow.iter().flat_map(|o| o.iter()).map(|&v| v as f64).sum::<f64>();
        field.data = next;
    }

    field.clamp01();
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_field_is_untouched() {
        let mut field = HeightField::filled(8, 8, 0.4).unwrap();
        let moved = relax_slopes(&mut field, &TalusConfig::default()).unwrap();
        assert_eq!(moved, 0.0);
        assert!(field.data.iter().all(|&h| h == 0.4));
    }

    #[test]
    fn test_spike_spreads_and_conserves_mass() {
        let mut field = HeightField::filled(9, 9, 0.2).unwrap();
        field.set(4, 4, 0.9);
        let before = field.total();
        let moved = relax_slopes(
            &mut field,
            &TalusConfig {
                iterations: 6,
                talus: 0.01,
                strength: 0.5,
            },
        )
        .unwrap();

        assert!(moved > 0.0);
        assert!(field.get(4, 4) < 0.9, "spike should lose height");
        assert!(field.get(4, 3) > 0.2, "neighbors should receive material");
        assert!((field.total() - before).abs() < 1e-4, "relaxation must conserve mass");
    }

    #[test]
    fn test_gentle_slopes_below_talus_stay() {
        let data = (0..16).map(|i| (i % 4) as f32 * 0.005).collect();
        let mut field = HeightField::from_vec(4, 4, data).unwrap();
        let original = field.clone();
        relax_slopes(&mut field, &TalusConfig::default()).unwrap();
        assert_eq!(field, original);
    }
}
