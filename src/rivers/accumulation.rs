//! D8 flow direction and contributing-area maps.

use rayon::prelude::*;

use crate::terrain::HeightField;

/// Marks a cell with no lower neighbor.
pub const NO_DOWNSTREAM: u32 = u32::MAX;

/// For each cell, the index of its lowest strictly-lower neighbor, or [`NO_DOWNSTREAM`].
pub fn compute_flow_directions(field: &HeightField) -> Vec<u32> {
    (0..field.len())
        .into_par_iter()
        .map(|i| {
            let mut best_idx = NO_DOWNSTREAM;
            let mut best_h = field.data[i];
            for dir in 0..8 {
                let Some(n) = field.neighbor(i, dir) else {
                    continue;
                };
                // Strictly lower only; ties keep the earlier direction.
                if field.data[n] < best_h {
                    best_h = field.data[n];
                    best_idx = n as u32;
                }
            }
            best_idx
        })
        .collect()
}

/// Contributing area in cells, given downstream indices.
pub fn compute_flow_accumulation(field: &HeightField, downstream: &[u32]) -> Vec<u32> {
    // Upstream cells are processed before the cells they drain into.
    let mut order: Vec<u32> = (0..field.len() as u32).collect();
    order.sort_by(|&a, &b| field.data[b as usize].total_cmp(&field.data[a as usize]));

    let mut accum = vec![1u32; field.len()];
    for &i in &order {
        let d = downstream[i as usize];
        if d != NO_DOWNSTREAM {
            let d = d as usize;
            accum[d] = accum[d].saturating_add(accum[i as usize]);
        }
    }
    accum
}

/// Binary river mask (0/255) from accumulation.
pub fn river_mask_from_accum(accum: &[u32], threshold: u32) -> Vec<u8> {
    accum
        .iter()
        .map(|&a| if a >= threshold { 255 } else { 0 })
        .collect()
}
