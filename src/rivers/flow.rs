//! River sources, downhill tracing and channel carving.

use std::collections::HashSet;

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::terrain::{HeightField, NEIGHBORS_8};
use super::config::RiverConfig;

/// One cell along a river.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverPoint {
    pub position: UVec2,
    pub flow: f32,
}

/// Why a river stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiverEnd {
    /// Flow fell below the minimum.
    Exhausted,
    /// No lower neighbor.
    LocalMinimum,
    /// Reached standing water.
    WaterBody,
    /// Joined a previously traced river.
    Confluence,
    /// Hit the length cap.
    LengthLimit,
}

/// An ordered path from source to terminus with non-increasing flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub points: Vec<RiverPoint>,
    pub end: RiverEnd,
}

impl River {
    pub fn source(&self) -> Option<&RiverPoint> {
        self.points.first()
    }

    pub fn terminus(&self) -> Option<&RiverPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Picks up to `count` sources among local maxima above `min_source_height`.
///
/// Highest first (ties by index), skipping candidates closer than
/// `min_source_spacing` to an already chosen source.
pub fn find_sources(field: &HeightField, count: usize, config: &RiverConfig) -> Vec<UVec2> {
    let mut candidates: Vec<usize> = (0..field.len())
        .filter(|&i| field.data[i] >= config.min_source_height && field.is_local_max(i))
        .collect();
    candidates.sort_by(|&a, &b| field.data[b].total_cmp(&field.data[a]).then(a.cmp(&b)));

    let spacing2 = config.min_source_spacing * config.min_source_spacing;
    let mut sources: Vec<UVec2> = Vec::with_capacity(count);
    for idx in candidates {
        if sources.len() >= count {
            break;
        }
        let (x, y) = field.coords(idx);
        let p = UVec2::new(x, y);
        let crowded = sources
            .iter()
            .any(|s| s.as_vec2().distance_squared(p.as_vec2()) < spacing2);
        if !crowded {
            sources.push(p);
        }
    }
    sources
}

/// Steepest strictly-downhill neighbor by drop per unit distance.
///
/// Neighbors are scanned N, NE, E, SE, S, SW, W, NW; only a strictly greater
/// drop replaces the current best, so earlier directions win ties.
fn steepest_descent(field: &HeightField, idx: usize) -> Option<(usize, f32)> {
    let h = field.data[idx];
    let mut best: Option<(usize, f32, f32)> = None;
    for (dir, &(dx, dy)) in NEIGHBORS_8.iter().enumerate() {
        let Some(n) = field.neighbor(idx, dir) else {
            continue;
        };
        let dist = if dx != 0 && dy != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
        let slope = (h - field.data[n]) / dist;
        if slope <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, s, _)| slope > s) {
            best = Some((n, slope, dist));
        }
    }
    best.map(|(n, _, dist)| (n, dist))
}

/// Traces a river downhill from `source`.
///
/// Cells in `occupied` belong to earlier rivers; entering one ends the river
/// at the confluence.
pub fn simulate_flow(
    field: &HeightField,
    moisture: &[f32],
    source: UVec2,
    occupied: &HashSet<usize>,
    config: &RiverConfig,
) -> River {
    let max_points = config.max_points();
    let mut current = field.index(source.x, source.y);
    let mut flow = 1.0f32;
    let mut points = vec![RiverPoint {
        position: source,
        flow,
    }];

    let end = loop {
        if field.data[current] <= config.sea_level {
            break RiverEnd::WaterBody;
        }
        if points.len() >= max_points {
            break RiverEnd::LengthLimit;
        }
        let Some((next, dist)) = steepest_descent(field, current) else {
            break RiverEnd::LocalMinimum;
        };

        let distance = dist * config.step_size;
        let loss = config.evaporation + config.infiltration * (1.0 - moisture[next].clamp(0.0, 1.0));
        flow *= (-loss * distance).exp();
        if flow < config.min_river_flow {
            break RiverEnd::Exhausted;
        }

        let (x, y) = field.coords(next);
        points.push(RiverPoint {
            position: UVec2::new(x, y),
            flow,
        });
        if occupied.contains(&next) {
            break RiverEnd::Confluence;
        }
        current = next;
    };

    River { points, end }
}

/// Carves `channel_depth` at each river cell and `bank_depth` around it.
pub fn apply_river_erosion(field: &mut HeightField, rivers: &[River], config: &RiverConfig) {
    for river in rivers {
        for point in &river.points {
            let idx = field.index(point.position.x, point.position.y);
            field.data[idx] -= config.channel_depth;
            for dir in 0..8 {
                if let Some(n) = field.neighbor(idx, dir) {
                    field.data[n] -= config.bank_depth;
                }
            }
        }
    }
    field.clamp01();
}

/// Deposits `delta_deposit` over the `(2r+1)²` square around each terminus.
pub fn generate_deltas(field: &mut HeightField, rivers: &[River], config: &RiverConfig) {
    let r = config.delta_radius as i64;
    for end in rivers.iter().filter_map(River::terminus) {
        let (ex, ey) = (end.position.x as i64, end.position.y as i64);
        for y in (ey - r)..=(ey + r) {
            for x in (ex - r)..=(ex + r) {
                if field.in_bounds(x, y) {
                    let idx = field.index(x as u32, y as u32);
                    field.data[idx] += config.delta_deposit;
                }
            }
        }
    }
    field.clamp01();
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Slope falling toward +x, with a ridge of maxima along x = 0.
    fn east_slope(w: u32, h: u32) -> HeightField {
        let data = (0..w * h)
            .map(|i| 1.0 - (i % w) as f32 / (w - 1) as f32)
            .collect();
        HeightField::from_vec(w, h, data).unwrap()
    }

    #[test]
    fn test_flow_is_non_increasing_and_bounded() {
        let field = east_slope(64, 8);
        let moisture = vec![0.2; field.len()];
        let config = RiverConfig {
            sea_level: 0.0,
            max_river_length: 20.0,
            ..Default::default()
        };
        let river = simulate_flow(&field, &moisture, UVec2::new(0, 4), &HashSet::new(), &config);
        assert!(river.len() <= config.max_points());
        assert_eq!(river.end, RiverEnd::LengthLimit);
        for pair in river.points.windows(2) {
            assert!(pair[1].flow <= pair[0].flow, "flow must not increase downstream");
        }
        assert_eq!(river.source().unwrap().flow, 1.0);
    }

    #[test]
    fn test_ties_prefer_first_direction() {
        // Center cell with equal drops to E and S: E comes first.
        let mut field = HeightField::filled(3, 3, 0.9).unwrap();
        field.set(1, 1, 0.8);
        field.set(2, 1, 0.5);
        field.set(1, 2, 0.5);
        let (next, _) = steepest_descent(&field, field.index(1, 1)).unwrap();
        assert_eq!(next, field.index(2, 1));
    }

    #[test]
    fn test_river_stops_at_water() {
        let field = east_slope(32, 4);
        let moisture = vec![1.0; field.len()];
        let config = RiverConfig {
            sea_level: 0.5,
            ..Default::default()
        };
        let river = simulate_flow(&field, &moisture, UVec2::new(0, 1), &HashSet::new(), &config);
        assert_eq!(river.end, RiverEnd::WaterBody);
        let last = river.terminus().unwrap().position;
        assert!(field.get(last.x, last.y) <= 0.5);
    }

    #[test]
    fn test_dry_ground_exhausts_flow() {
        let field = east_slope(256, 3);
        let moisture = vec![0.0; field.len()];
        let config = RiverConfig {
            sea_level: 0.0,
            infiltration: 0.2,
            ..Default::default()
        };
        let river = simulate_flow(&field, &moisture, UVec2::new(0, 1), &HashSet::new(), &config);
        assert_eq!(river.end, RiverEnd::Exhausted);
        assert!(river.points.iter().all(|p| p.flow >= config.min_river_flow));
    }

    #[test]
    fn test_confluence_ends_river() {
        let field = east_slope(32, 4);
        let moisture = vec![1.0; field.len()];
        let config = RiverConfig {
            sea_level: 0.0,
            ..Default::default()
        };
        let occupied: HashSet<usize> = [field.index(5, 1)].into_iter().collect();
        let river = simulate_flow(&field, &moisture, UVec2::new(0, 1), &occupied, &config);
        assert_eq!(river.end, RiverEnd::Confluence);
        assert_eq!(river.terminus().unwrap().position, UVec2::new(5, 1));
    }

    #[test]
    fn test_sources_respect_spacing() {
        let mut field = HeightField::filled(40, 40, 0.1).unwrap();
        field.set(5, 5, 0.9);
        field.set(8, 5, 0.8);
        field.set(30, 30, 0.7);
        let config = RiverConfig {
            min_source_spacing: 10.0,
            ..Default::default()
        };
        let sources = find_sources(&field, 5, &config);
        assert_eq!(sources, vec![UVec2::new(5, 5), UVec2::new(30, 30)]);
    }

    #[test]
    fn test_carving_and_deltas_stay_in_range() {
        let mut field = HeightField::filled(8, 8, 0.5).unwrap();
        let river = River {
            points: vec![
                RiverPoint {
                    position: UVec2::new(3, 3),
                    flow: 1.0,
                },
                RiverPoint {
                    position: UVec2::new(0, 0),
                    flow: 0.9,
                },
            ],
            end: RiverEnd::LocalMinimum,
        };
        let config = RiverConfig {
            channel_depth: 0.6,
            delta_deposit: 0.8,
            ..Default::default()
        };
        apply_river_erosion(&mut field, std::slice::from_ref(&river), &config);
        assert_eq!(field.get(3, 3), 0.0);
        assert!((field.get(4, 4) - (0.5 - config.bank_depth)).abs() < 1e-6);

        generate_deltas(&mut field, &[river], &config);
        assert!((field.get(0, 0) - 0.8).abs() < 1e-6);
        assert_eq!(field.get(2, 2), 1.0);
        assert_eq!(field.get(3, 3), 0.0, "outside the delta square");
        assert!(field.data.iter().all(|h| (0.0..=1.0).contains(h)));
    }
}
