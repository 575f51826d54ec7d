//! River networks: source selection, downhill tracing, channel carving and
//! terminus deltas, plus a D8 flow-accumulation map.

mod accumulation;
mod config;
mod flow;

pub use accumulation::{compute_flow_accumulation, compute_flow_directions, river_mask_from_accum, NO_DOWNSTREAM};
pub use config::RiverConfig;
pub use flow::{apply_river_erosion, find_sources, generate_deltas, simulate_flow, River, RiverEnd, RiverPoint};

use std::collections::HashSet;

use tracing::debug;

use crate::error::{check_len, Result};
use crate::terrain::HeightField;

/// Builds rivers over a heightfield and carves them in.
#[derive(Debug, Clone, Default)]
pub struct RiverNetworkBuilder {
    pub config: RiverConfig,
}

impl RiverNetworkBuilder {
    pub fn new(config: RiverConfig) -> Self {
        Self { config }
    }

    /// Traces rivers from the selected sources in order, then carves channels
    /// and deposits deltas. Later rivers end where they meet earlier ones.
    pub fn build(&self, field: &mut HeightField, moisture: &[f32]) -> Result<Vec<River>> {
        self.config.validate()?;
        check_len("moisture", field.len(), moisture.len())?;

        let sources = find_sources(field, self.config.source_count, &self.config);
        let mut occupied: HashSet<usize> = HashSet::new();
        let mut rivers = Vec::with_capacity(sources.len());
        for source in sources {
            let river = simulate_flow(field, moisture, source, &occupied, &self.config);
            occupied.extend(
                river
                    .points
                    .iter()
                    .map(|p| field.index(p.position.x, p.position.y)),
            );
            rivers.push(river);
        }

        apply_river_erosion(field, &rivers, &self.config);
        generate_deltas(field, &rivers, &self.config);

        debug!(
            rivers = rivers.len(),
            points = rivers.iter().map(River::len).sum::<usize>(),
            "rivers built"
        );
        Ok(rivers)
    }

    /// Like [`build`](Self::build) with uniform `config.moisture`.
    pub fn build_uniform(&self, field: &mut HeightField) -> Result<Vec<River>> {
        let moisture = vec![self.config.moisture; field.len()];
        self.build(field, &moisture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    fn twin_peaks(size: u32) -> HeightField {
        let peaks = [(size as f32 * 0.25, size as f32 * 0.3), (size as f32 * 0.75, size as f32 * 0.7)];
        let data = (0..size * size)
            .map(|i| {
                let x = (i % size) as f32;
                let y = (i / size) as f32;
                peaks
                    .iter()
                    .map(|&(px, py)| {
                        let d = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                        0.95 * (-d * d / (2.0 * (size as f32 * 0.2).powi(2))).exp()
                    })
                    .fold(0.0f32, f32::max)
            })
            .collect();
        HeightField::from_vec(size, size, data).unwrap()
    }

    #[test]
    fn test_build_traces_and_stays_in_range() {
        let mut field = twin_peaks(64);
        let builder = RiverNetworkBuilder::new(RiverConfig {
            min_source_spacing: 8.0,
            ..Default::default()
        });
        let rivers = builder.build_uniform(&mut field).unwrap();
        assert_eq!(rivers.len(), 2, "one river per peak");
        for river in &rivers {
            assert!(river.len() > 1);
            assert!(river.len() <= builder.config.max_points());
            assert!(river.points.windows(2).all(|w| w[1].flow <= w[0].flow));
        }
        assert!(field.data.iter().all(|h| (0.0..=1.0).contains(h)));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = RiverNetworkBuilder::default();
        let mut a = twin_peaks(48);
        let mut b = a.clone();
        let ra = builder.build_uniform(&mut a).unwrap();
        let rb = builder.build_uniform(&mut b).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(a, b);
    }

    #[test]
    fn test_moisture_dimension_checked() {
        let mut field = twin_peaks(16);
        let err = RiverNetworkBuilder::default()
            .build(&mut field, &[0.5; 3])
            .unwrap_err();
        assert!(matches!(err, TerrainError::InvalidDimension { .. }));
    }
}
