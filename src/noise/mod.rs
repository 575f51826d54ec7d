//! Noise generation for terrain synthesis.
//!
//! Fractal and ridged noise use simdnoise gradient samples per octave;
//! cellular noise hashes one feature point per unit cell. All functions are
//! pure and safe to call from rayon workers.

mod cellular;
mod fractal;
mod layer;

pub use cellular::cellular;
pub use fractal::{fractal, gradient01, ridged, MIN_SCALE, SCALE_EPSILON};
pub use layer::{NoiseKind, NoiseLayerConfig};
