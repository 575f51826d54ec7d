//! Headless wgpu context for compute workloads.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErosionGpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    RequestDevice(String),
    #[error("Grid of {bytes} bytes exceeds the storage buffer limit of {limit} bytes")]
    BufferTooLarge { bytes: u64, limit: u64 },
    #[error("Failed to read results back from the GPU: {0}")]
    Readback(String),
}

/// Holds a wgpu device/queue used for erosion compute.
///
/// Pipeline setup lives in `pipelines.rs`.
pub struct ErosionGpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Largest storage buffer binding the device accepts.
    pub max_storage_bytes: u64,
}

impl ErosionGpuContext {
    /// Create a headless wgpu device/queue suitable for compute.
    pub async fn new() -> Result<Self, ErosionGpuError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ErosionGpuError::NoAdapter)?;

        // Ask for what the adapter offers so large grids fit in one binding.
        let limits = adapter.limits();
        let max_storage_bytes = limits.max_storage_buffer_binding_size as u64;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("terrasim-erosion-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ErosionGpuError::RequestDevice(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            max_storage_bytes,
        })
    }
}
