//! Terrain data and base synthesis.
//!
//! Provides the [`HeightField`] grid every stage operates on and the
//! noise-layer synthesizer that produces the initial landscape.

mod heightfield;
mod synthesis;

pub use heightfield::{sea_level_for_coverage, HeightField, NEIGHBORS_8};
pub use synthesis::{HeightfieldSynthesizer, LayerWeights, MicroDetailConfig, SynthesisConfig};
