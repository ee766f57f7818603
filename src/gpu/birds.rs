//! Draws the bird mesh straight from the compute backend's state textures.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::Mat4;
use wgpu::util::DeviceExt;

use super::camera::Camera;
use super::compute::GpuCompute;
use super::{create_depth_texture, DEPTH_FORMAT};
use crate::driver::Renderer;
use crate::geometry::{BirdGeometry, BirdVertex};
use crate::params::StepUniforms;
use crate::shader::{BirdUniforms, BIRDS_SOURCE};
use crate::state::Attribute;

/// Window background.
const CLEAR_COLOR: wgpu::Color = wgpu::Color::WHITE;

/// Surface-owning renderer for the flock.
pub struct BirdRenderer {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    /// `bind_groups[p]` samples half `p` of the state textures.
    bind_groups: [wgpu::BindGroup; 2],
    model: Mat4,
    pub camera: Camera,
    last_error: Option<wgpu::SurfaceError>,
}

impl BirdRenderer {
    pub fn new(
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        compute: &GpuCompute,
        mesh: &BirdGeometry,
    ) -> Self {
        let device = compute.device().clone();
        let queue = compute.queue().clone();
        surface.configure(&device, &config);
        let depth_texture = create_depth_texture(&device, config.width, config.height);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bird Vertex Buffer"),
            contents: mesh.as_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Bird Uniform Buffer"),
            size: std::mem::size_of::<BirdUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let state_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bird Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                state_entry(1),
                state_entry(2),
            ],
        });

        let bind_groups = [0, 1].map(|half| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Bird Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(compute.view(Attribute::Position, half)),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(compute.view(Attribute::Velocity, half)),
                    },
                ],
            })
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bird Shader"),
            source: wgpu::ShaderSource::Wgsl(BIRDS_SOURCE.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bird Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Bird Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[BirdVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // wings are seen from both sides
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::info!(
            "bird renderer: {} vertices, surface {}x{} {:?}",
            mesh.vertex_count(),
            config.width,
            config.height,
            config.format
        );

        Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline,
            vertex_buffer,
            vertex_count: mesh.vertex_count(),
            uniform_buffer,
            bind_groups,
            model: Mat4::from_rotation_y(FRAC_PI_2),
            camera: Camera::new(),
            last_error: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, width, height);
        }
    }

    /// Reconfigure the surface with its current size, after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Surface error from the most recent draw, if any.
    pub fn take_error(&mut self) -> Option<wgpu::SurfaceError> {
        self.last_error.take()
    }

    fn write_uniforms(&self, uniforms: &StepUniforms) {
        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        let bird_uniforms = BirdUniforms {
            view_proj: self.camera.view_proj(aspect).to_cols_array_2d(),
            model: self.model.to_cols_array_2d(),
            time: uniforms.time,
            delta: uniforms.delta,
            _padding: [0.0; 2],
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&bird_uniforms));
    }

    /// Draw the flock from `compute`'s current state.
    pub fn render(&mut self, compute: &GpuCompute, uniforms: &StepUniforms) -> Result<(), wgpu::SurfaceError> {
        self.write_uniforms(uniforms);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Bird Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bird Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_groups[compute.current_index()], &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..self.vertex_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl Renderer<GpuCompute> for BirdRenderer {
    fn draw(&mut self, backend: &GpuCompute, uniforms: &StepUniforms) {
        if let Err(e) = self.render(backend, uniforms) {
            self.last_error = Some(e);
        }
    }
}
