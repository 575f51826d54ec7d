//! Geological feature simulation: tectonic faults and volcanic hotspots.
//!
//! Features are generated once per seed, applied to the heightfield and
//! returned as read-only metadata.

mod config;
mod faults;
mod volcanic;

pub use config::GeologyConfig;
pub use faults::{apply_fault_displacement, generate_fault_lines, FaultLine};
pub use volcanic::{apply_volcanic_formation, find_volcanic_hotspots, VolcanicHotspot};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::terrain::HeightField;

/// A geological feature applied to the terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeologicalFeature {
    FaultLine(FaultLine),
    VolcanicHotspot(VolcanicHotspot),
}

/// Applies fault displacement and volcanic uplift to a heightfield.
#[derive(Debug, Clone, Default)]
pub struct GeologicalSimulator {
    pub config: GeologyConfig,
}

impl GeologicalSimulator {
    pub fn new(config: GeologyConfig) -> Self {
        Self { config }
    }

    pub fn generate_fault_lines(&self, seed: u64, count: usize) -> Vec<FaultLine> {
        generate_fault_lines(seed, count, &self.config)
    }

    pub fn apply_fault_displacement(&self, field: &mut HeightField, fault: &FaultLine) {
        apply_fault_displacement(field, fault, self.config.fault_band_width);
    }

    pub fn find_volcanic_hotspots(&self, field: &HeightField, threshold: f32) -> Vec<VolcanicHotspot> {
        find_volcanic_hotspots(
            field,
            threshold,
            self.config.hotspot_spacing,
            self.config.max_hotspots,
            self.config.volcanic_strength,
            (self.config.seed as i32).wrapping_add(7919),
        )
    }

    pub fn apply_volcanic_formation(&self, field: &mut HeightField, hotspot: &VolcanicHotspot) {
        apply_volcanic_formation(
            field,
            hotspot,
            self.config.volcano_radius,
            self.config.caldera_depth,
        );
    }

    /// Runs faults then volcanism and returns every feature that was applied.
    pub fn simulate(&self, field: &mut HeightField) -> Result<Vec<GeologicalFeature>> {
        self.config.validate()?;

        let faults = self.generate_fault_lines(self.config.seed, self.config.fault_count);
        for fault in &faults {
            self.apply_fault_displacement(field, fault);
        }

        let hotspots = self.find_volcanic_hotspots(field, self.config.volcanic_threshold);
        for hotspot in &hotspots {
            self.apply_volcanic_formation(field, hotspot);
        }

        debug!(faults = faults.len(), hotspots = hotspots.len(), "geology applied");

        Ok(faults
            .into_iter()
            .map(GeologicalFeature::FaultLine)
            .chain(hotspots.into_iter().map(GeologicalFeature::VolcanicHotspot))
            .collect())
    }
}
