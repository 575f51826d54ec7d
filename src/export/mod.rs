//! Export module for saving terrain data to files.
//!
//! Supports 16-bit PNG heightfields, RAW heightfields and biome weights,
//! dominant-biome preview maps, and river paths as JSON.

mod biome_map;
mod png;
mod raw;
mod rivers;

pub use biome_map::{export_biome_map_png, BiomeMapError, BiomeMapOptions};
pub use png::{export_heightfield_png, export_mask_png_u8, PngExportError, PngExportOptions};
pub use raw::{export_biome_weights_raw, export_heightfield_raw, expected_file_size, RawExportError, RawFormat};
pub use rivers::{export_rivers_json, RiverExportError};
