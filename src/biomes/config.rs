//! Biome definitions and weighting configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Piecewise-linear curve over `[0, 1]`.
///
/// Points are `(x, y)` pairs sorted by `x`. Inputs outside the first/last
/// point take the end values; an empty curve evaluates to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCurve {
    pub points: Vec<(f32, f32)>,
}

impl ResponseCurve {
    pub fn constant(value: f32) -> Self {
        Self {
            points: vec![(0.0, value)],
        }
    }

    /// Identity on `[0, 1]`.
    pub fn linear() -> Self {
        Self {
            points: vec![(0.0, 0.0), (1.0, 1.0)],
        }
    }

    /// Rises from `edge` at both ends to 1 at `peak`.
    pub fn tent(peak: f32, edge: f32) -> Self {
        Self {
            points: vec![(0.0, edge), (peak.clamp(0.0, 1.0), 1.0), (1.0, edge)],
        }
    }

    pub fn from_points(points: Vec<(f32, f32)>) -> Result<Self> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let Some(&(x0, y0)) = self.points.first() else {
            return 1.0;
        };
        if t <= x0 {
            return y0;
        }
        for pair in self.points.windows(2) {
            let (xa, ya) = pair[0];
            let (xb, yb) = pair[1];
            if t <= xb {
                let span = xb - xa;
                if span <= f32::EPSILON {
                    return yb;
                }
                return ya + (yb - ya) * (t - xa) / span;
            }
        }
        self.points.last().map_or(1.0, |&(_, y)| y)
    }

    pub fn validate(&self) -> Result<()> {
        if self.points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(TerrainError::invalid("response_curve", "points must be finite"));
        }
        if self.points.windows(2).any(|w| w[1].0 < w[0].0) {
            return Err(TerrainError::invalid("response_curve", "points must be sorted by x"));
        }
        Ok(())
    }
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

/// One candidate biome and its climate envelope.
///
/// Heights are normalized `[0, 1]`, temperatures °C, moisture `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDefinition {
    pub name: String,
    pub min_height: f32,
    pub max_height: f32,
    /// Weight across the height band, sampled at the position within `[min, max]`.
    pub height_curve: ResponseCurve,
    pub temperature_optimum: f32,
    pub temperature_range: f32,
    pub moisture_optimum: f32,
    pub moisture_range: f32,
    /// 0 is strict about the optimum, 1 ignores it.
    pub adaptability: f32,
    pub seasonal_variation: f32,
    /// Cellular-noise scale for transition perturbation.
    pub blend_distance: f32,
    /// Preview color.
    pub color: [u8; 3],
}

impl BiomeDefinition {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_height <= self.max_height) {
            return Err(TerrainError::invalid(
                "height band",
                format!("{}: min_height must not exceed max_height", self.name),
            ));
        }
        if !(self.temperature_range > 0.0) {
            return Err(TerrainError::invalid(
                "temperature_range",
                format!("{}: must be positive", self.name),
            ));
        }
        if !(self.moisture_range > 0.0) {
            return Err(TerrainError::invalid(
                "moisture_range",
                format!("{}: must be positive", self.name),
            ));
        }
        if !(0.0..=1.0).contains(&self.adaptability) {
            return Err(TerrainError::invalid(
                "adaptability",
                format!("{}: must be in [0, 1]", self.name),
            ));
        }
        if !(self.blend_distance > 0.0) {
            return Err(TerrainError::invalid(
                "blend_distance",
                format!("{}: must be positive", self.name),
            ));
        }
        self.height_curve.validate()
    }
}

#[allow(clippy::too_many_arguments)]
fn biome(
    name: &str,
    heights: (f32, f32),
    height_curve: ResponseCurve,
    temperature: (f32, f32),
    moisture: (f32, f32),
    adaptability: f32,
    seasonal_variation: f32,
    color: [u8; 3],
) -> BiomeDefinition {
    BiomeDefinition {
        name: name.to_string(),
        min_height: heights.0,
        max_height: heights.1,
        height_curve,
        temperature_optimum: temperature.0,
        temperature_range: temperature.1,
        moisture_optimum: moisture.0,
        moisture_range: moisture.1,
        adaptability,
        seasonal_variation,
        blend_distance: 2.0,
        color,
    }
}

/// Built-in biome set tuned for the default climate.
pub fn default_biomes() -> Vec<BiomeDefinition> {
    vec![
        biome("underwater", (0.0, 0.3), ResponseCurve::constant(1.0), (12.0, 30.0), (1.0, 1.0), 0.9, 0.0, [40, 70, 140]),
        biome("beach", (0.26, 0.36), ResponseCurve::tent(0.4, 0.2), (18.0, 15.0), (0.6, 0.6), 0.6, 0.0, [220, 210, 160]),
        biome("desert", (0.3, 0.7), ResponseCurve::tent(0.3, 0.4), (28.0, 10.0), (0.1, 0.2), 0.2, 0.1, [225, 195, 120]),
        biome("grassland", (0.3, 0.65), ResponseCurve::tent(0.3, 0.3), (15.0, 12.0), (0.5, 0.3), 0.4, 0.3, [120, 175, 80]),
        biome("jungle", (0.3, 0.6), ResponseCurve::tent(0.2, 0.3), (26.0, 8.0), (0.9, 0.2), 0.3, 0.2, [30, 120, 50]),
        biome("canyon", (0.45, 0.8), ResponseCurve::tent(0.5, 0.2), (20.0, 12.0), (0.2, 0.25), 0.3, 0.0, [180, 100, 60]),
        biome("rock", (0.6, 0.92), ResponseCurve::linear(), (5.0, 15.0), (0.4, 0.5), 0.5, 0.0, [130, 125, 120]),
        biome("snow", (0.78, 1.0), ResponseCurve::linear(), (-6.0, 10.0), (0.5, 0.6), 0.5, 0.4, [245, 248, 255]),
        biome("arctic", (0.3, 0.75), ResponseCurve::constant(1.0), (-15.0, 10.0), (0.4, 0.5), 0.4, 0.2, [200, 215, 225]),
    ]
}

/// Cellular-noise perturbation of weights near biome transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub enabled: bool,
    pub seed: u64,
    /// Blend factor toward the perturbed weight, sampled at the noise value.
    pub blend_curve: ResponseCurve,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 12345,
            blend_curve: ResponseCurve {
                points: vec![(0.0, 0.0), (0.5, 0.35), (1.0, 0.6)],
            },
        }
    }
}

impl TransitionConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Biome set plus the settings for one weighting pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// Season as a fraction of the year [0, 1).
    pub season: f32,
    pub transitions: TransitionConfig,
    pub biomes: Vec<BiomeDefinition>,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            season: 0.0,
            transitions: TransitionConfig::default(),
            biomes: default_biomes(),
        }
    }
}

impl BiomeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.season.is_finite() {
            return Err(TerrainError::invalid("season", "must be finite"));
        }
        self.transitions.blend_curve.validate()?;
        validate_biomes(&self.biomes)
    }
}

/// Checks a biome list before weighting.
pub fn validate_biomes(biomes: &[BiomeDefinition]) -> Result<()> {
    if biomes.is_empty() {
        return Err(TerrainError::invalid("biomes", "at least one biome is required"));
    }
    biomes.iter().try_for_each(BiomeDefinition::validate)
}
