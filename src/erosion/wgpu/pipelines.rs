//! Compute pipelines for the grid erosion passes.

use std::borrow::Cow;

use wgpu::util::DeviceExt;

use crate::erosion::backend::{GridEroder, GridPassParams};
use crate::erosion::working_set::ErosionWorkingSet;
use crate::error::Result;
use super::context::{ErosionGpuContext, ErosionGpuError};

const WORKGROUP_SIZE: u32 = 64;
const MAX_GROUPS_PER_DIM: u32 = 65_535;

/// Grid passes on the GPU over storage buffers.
pub struct GpuGridEroder {
    ctx: ErosionGpuContext,
    bgl: wgpu::BindGroupLayout,
    hydraulic: wgpu::ComputePipeline,
    thermal: wgpu::ComputePipeline,
    wind: wgpu::ComputePipeline,
    chemical: wgpu::ComputePipeline,
}

fn buffer_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    buffer_entry(binding, wgpu::BufferBindingType::Storage { read_only })
}

/// Workgroup counts covering `cells`, folded into 2D past the per-dimension cap.
fn dispatch_size(cells: u32) -> (u32, u32) {
    let groups = cells.div_ceil(WORKGROUP_SIZE).max(1);
    if groups <= MAX_GROUPS_PER_DIM {
        (groups, 1)
    } else {
        (MAX_GROUPS_PER_DIM, groups.div_ceil(MAX_GROUPS_PER_DIM))
    }
}

impl GpuGridEroder {
    /// Acquires a device and builds the pipelines.
    pub async fn new() -> std::result::Result<Self, ErosionGpuError> {
        let ctx = ErosionGpuContext::new().await?;
        Ok(Self::with_context(ctx))
    }

    pub fn with_context(ctx: ErosionGpuContext) -> Self {
        let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrasim-grid-pass-wgsl"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/grid_pass.wgsl"))),
        });

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrasim-grid-pass-bgl"),
            entries: &[
                buffer_entry(0, wgpu::BufferBindingType::Uniform),
                // Inputs
                storage(1, true),
                storage(2, true),
                storage(3, true),
                // Accumulators
                storage(4, false),
                storage(5, false),
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrasim-grid-pass-pipeline-layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let make = |entry: &str| {
            ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(entry),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let hydraulic = make("hydraulic");
        let thermal = make("thermal");
        let wind = make("wind");
        let chemical = make("chemical");

        Self {
            ctx,
            bgl,
            hydraulic,
            thermal,
            wind,
            chemical,
        }
    }

    fn upload(&self, label: &str, values: &[f32], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(values),
            usage,
        })
    }

    fn readback(&self, source: &wgpu::Buffer, size: u64, label: &str) -> std::result::Result<Vec<f32>, ErosionGpuError> {
        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}-readback-buffer")),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&format!("{label}-readback-encoder")),
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        // Block until the mapping is ready.
        self.ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ErosionGpuError::Readback(e.to_string()))?
            .map_err(|e| ErosionGpuError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let out = bytemuck::cast_slice::<u8, f32>(&data).to_vec();
        drop(data);
        staging.unmap();
        Ok(out)
    }

    /// Runs `iterations` sweeps and writes the accumulators back into `set`.
    pub fn run_passes(
        &self,
        set: &mut ErosionWorkingSet,
        params: &GridPassParams,
        iterations: u32,
    ) -> std::result::Result<(), ErosionGpuError> {
        let bytes = (set.len() * std::mem::size_of::<f32>()) as u64;
        if bytes > self.ctx.max_storage_bytes {
            return Err(ErosionGpuError::BufferTooLarge {
                bytes,
                limit: self.ctx.max_storage_bytes,
            });
        }

        let params_buf = self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrasim-grid-pass-params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let input = wgpu::BufferUsages::STORAGE;
        let accumulator = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC;
        let moisture = self.upload("moisture", &set.moisture, input);
        let hardness = self.upload("hardness", &set.hardness, input);
        let temperature = self.upload("temperature", &set.temperature, input);
        let erosion = self.upload("erosion", &set.erosion, accumulator);
        let sediment = self.upload("sediment", &set.sediment, accumulator);

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrasim-grid-pass-bind-group"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: moisture.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: hardness.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: temperature.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: erosion.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: sediment.as_entire_binding(),
                },
            ],
        });

        let (gx, gy) = dispatch_size(params.cells);
        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrasim-grid-pass-encoder"),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("terrasim-grid-pass"),
                timestamp_writes: None,
            });
            cpass.set_bind_group(0, &bind_group, &[]);
            for _ in 0..iterations {
                for pipeline in [&self.hydraulic, &self.thermal, &self.wind, &self.chemical] {
                    cpass.set_pipeline(pipeline);
                    cpass.dispatch_workgroups(gx, gy, 1);
                }
            }
        }
        self.ctx.queue.submit(Some(encoder.finish()));

        let eroded = self.readback(&erosion, bytes, "erosion")?;
        let deposited = self.readback(&sediment, bytes, "sediment")?;
        set.erosion.copy_from_slice(&eroded[..set.len()]);
        set.sediment.copy_from_slice(&deposited[..set.len()]);
        Ok(())
    }
}

impl GridEroder for GpuGridEroder {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn run(&self, set: &mut ErosionWorkingSet, params: &GridPassParams, iterations: u32) -> Result<()> {
        self.run_passes(set, params, iterations)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_size_small_grid() {
        assert_eq!(dispatch_size(16), (1, 1));
        assert_eq!(dispatch_size(64), (1, 1));
        assert_eq!(dispatch_size(65), (2, 1));
    }

    #[test]
    fn test_dispatch_size_folds_large_grids() {
        let cells = 8192 * 8192;
        let (gx, gy) = dispatch_size(cells);
        assert_eq!(gx, MAX_GROUPS_PER_DIM);
        assert!(gx as u64 * gy as u64 * WORKGROUP_SIZE as u64 >= cells as u64);
    }
}
