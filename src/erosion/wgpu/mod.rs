//! wgpu compute implementation of the grid passes.

mod context;
mod pipelines;

pub use context::{ErosionGpuContext, ErosionGpuError};
pub use pipelines::GpuGridEroder;
