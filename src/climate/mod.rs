//! Climate provider: moisture and temperature derived from terrain.
//!
//! Erosion and biome weighting treat these grids as read-only inputs; callers
//! with their own weather model can build [`ClimateInputs`] directly.

mod config;
mod fields;
mod util;

pub use config::ClimateConfig;
pub use fields::{derive_climate, ClimateFields, ClimateInputs, TemperatureInput};
pub use util::{lerp, row_latitude, season_sin};
