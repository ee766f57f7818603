//! GPU backend: one compute pipeline per graph variable, state held in
//! `Rgba32Float` storage textures.

use std::sync::Arc;

use bytemuck::Zeroable;
use glam::Vec4;
use wgpu::util::DeviceExt;

use super::{GpuContext, STATE_FORMAT};
use crate::compute::{self, ComputeGraph, GridCompute};
use crate::error::{ComputeError, GpuError};
use crate::params::StepUniforms;
use crate::shader::{self, WORKGROUP_SIZE};
use crate::state::{texel_count, Attribute, StateSnapshot, StateStore, StateTexture};

const BYTES_PER_TEXEL: u32 = 16;

/// Both halves of one attribute's ping-pong pair.
struct TexturePair {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
}

/// A compiled graph variable. `bind_groups[p]` reads half `p` and writes
/// half `1 - p`.
struct Kernel {
    attribute: Attribute,
    pipeline: wgpu::ComputePipeline,
    bind_groups: [wgpu::BindGroup; 2],
}

/// [`GridCompute`] on the GPU.
pub struct GpuCompute {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    width: u32,
    position: TexturePair,
    velocity: TexturePair,
    uniform_buffer: wgpu::Buffer,
    kernels: Vec<Kernel>,
    /// Half holding the most recent state, shared by every pair.
    current: usize,
    steps: u64,
}

impl GpuCompute {
    /// Upload `store` and build the flocking pipelines.
    ///
    /// Fails with [`GpuError::UnsupportedFormat`] when the adapter cannot
    /// write full-precision float storage textures.
    pub fn new(context: &GpuContext, store: &StateStore) -> Result<Self, ComputeError> {
        compute::check_store(store)?;
        context.check_state_format()?;

        let graph = ComputeGraph::flocking();
        graph.validate()?;

        let device = context.device.clone();
        let queue = context.queue.clone();
        let width = store.width();

        let position = create_pair(&device, &queue, store.current_position(), Attribute::Position);
        let velocity = create_pair(&device, &queue, store.current_velocity(), Attribute::Velocity);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Step Uniform Buffer"),
            contents: bytemuck::bytes_of(&StepUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut compute = Self {
            device,
            queue,
            width,
            position,
            velocity,
            uniform_buffer,
            kernels: Vec::with_capacity(graph.len()),
            current: 0,
            steps: 0,
        };

        for variable in graph.evaluation_order() {
            let kernel = compute.build_kernel(variable.attribute(), variable.dependencies());
            compute.kernels.push(kernel);
        }

        log::info!(
            "gpu compute: {} birds on a {}x{} grid, {} kernels",
            store.agent_count(),
            width,
            width,
            compute.kernels.len()
        );

        Ok(compute)
    }

    fn pair(&self, attribute: Attribute) -> &TexturePair {
        match attribute {
            Attribute::Position => &self.position,
            Attribute::Velocity => &self.velocity,
        }
    }

    fn build_kernel(&self, attribute: Attribute, dependencies: &[Attribute]) -> Kernel {
        let device = &self.device;
        let label = attribute.name();

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader::kernel_source(attribute).into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for (i, _) in dependencies.iter().enumerate() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let output_binding = 1 + dependencies.len() as u32;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: output_binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: STATE_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });

        let bind_groups = [0, 1].map(|half| {
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }];
            for (i, dependency) in dependencies.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1 + i as u32,
                    resource: wgpu::BindingResource::TextureView(&self.pair(*dependency).views[half]),
                });
            }
            entries.push(wgpu::BindGroupEntry {
                binding: output_binding,
                resource: wgpu::BindingResource::TextureView(&self.pair(attribute).views[1 - half]),
            });
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &entries,
            })
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Kernel {
            attribute,
            pipeline,
            bind_groups,
        }
    }

    /// View of half `half` (0 or 1) of `attribute`'s pair.
    pub fn view(&self, attribute: Attribute, half: usize) -> &wgpu::TextureView {
        &self.pair(attribute).views[half]
    }

    /// Index of the half holding the current state.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Copy the current grid of `attribute` back to the CPU.
    pub fn read_texture(&self, attribute: Attribute) -> Result<StateTexture, GpuError> {
        let texture = &self.pair(attribute).textures[self.current];

        let unpadded_bytes_per_row = BYTES_PER_TEXEL * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded_bytes_per_row + align - 1) / align * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("State Readback Buffer"),
            size: padded_bytes_per_row as u64 * self.width as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("State Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.width),
                },
            },
            texture_extent(self.width),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(GpuError::BufferMapping(e.to_string())),
            Err(e) => return Err(GpuError::BufferMapping(e.to_string())),
        }

        let texels = {
            let data = slice.get_mapped_range();
            let mut texels = Vec::with_capacity(texel_count(self.width));
            for row in data.chunks(padded_bytes_per_row as usize) {
                let row: &[[f32; 4]] = bytemuck::cast_slice(&row[..unpadded_bytes_per_row as usize]);
                texels.extend(row.iter().copied().map(Vec4::from_array));
            }
            texels
        };
        staging_buffer.unmap();

        Ok(StateTexture::from_texels(self.width, texels))
    }
}

impl GridCompute for GpuCompute {
    fn width(&self) -> u32 {
        self.width
    }

    fn step(&mut self, uniforms: &StepUniforms) {
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let workgroups = self.width.div_ceil(WORKGROUP_SIZE);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Flock Step Encoder"),
            });

        for kernel in &self.kernels {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.attribute.name()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &kernel.bind_groups[self.current], &[]);
            pass.dispatch_workgroups(workgroups, workgroups, 1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.current = 1 - self.current;
        self.steps += 1;
    }

    fn steps(&self) -> u64 {
        self.steps
    }

    fn snapshot(&self) -> Result<StateSnapshot, ComputeError> {
        let position = self.read_texture(Attribute::Position)?;
        let velocity = self.read_texture(Attribute::Velocity)?;
        Ok(StateSnapshot::from_textures(&position, &velocity))
    }

    fn backend_name(&self) -> &'static str {
        "gpu"
    }
}

fn texture_extent(width: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height: width,
        depth_or_array_layers: 1,
    }
}

fn create_pair(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    initial: &StateTexture,
    attribute: Attribute,
) -> TexturePair {
    let width = initial.width();
    let textures = [0, 1].map(|_| {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(attribute.name()),
            size: texture_extent(width),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            initial.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_TEXEL * width),
                rows_per_image: Some(width),
            },
            texture_extent(width),
        );
        texture
    });
    let views = [0, 1].map(|half| textures[half].create_view(&wgpu::TextureViewDescriptor::default()));
    TexturePair { textures, views }
}
