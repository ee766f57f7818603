//! wgpu backend: device setup, state-texture compute and the bird renderer.

mod birds;
mod camera;
mod compute;

use std::sync::Arc;

pub use birds::BirdRenderer;
pub use camera::Camera;
pub use compute::GpuCompute;

use crate::error::GpuError;

/// Format of every state texture.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Adapter, device and queue shared by the compute backend and the renderer.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

/// Instance over the primary native backends.
pub fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

impl GpuContext {
    /// Pick an adapter (able to present to `surface`, if given) and open a device.
    pub async fn new(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Context without a surface, for headless compute.
    pub fn headless() -> Result<Self, GpuError> {
        pollster::block_on(Self::new(new_instance(), None))
    }

    /// Check the adapter can write the state textures as storage.
    pub fn check_state_format(&self) -> Result<(), GpuError> {
        check_state_features(&self.adapter.get_texture_format_features(STATE_FORMAT))
    }

    /// Surface configuration preferring an sRGB format.
    pub fn surface_config(&self, surface: &wgpu::Surface<'_>, width: u32, height: u32) -> wgpu::SurfaceConfiguration {
        let surface_caps = surface.get_capabilities(&self.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);

        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Whether [`STATE_FORMAT`] with `features` can back the state textures.
///
/// The kernels sample the previous grid and write the next one as storage, so
/// both usages are required.
pub fn check_state_features(features: &wgpu::TextureFormatFeatures) -> Result<(), GpuError> {
    let required = wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING;
    if features.allowed_usages.contains(required) {
        Ok(())
    } else {
        Err(GpuError::UnsupportedFormat(STATE_FORMAT))
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(allowed_usages: wgpu::TextureUsages) -> wgpu::TextureFormatFeatures {
        wgpu::TextureFormatFeatures {
            allowed_usages,
            flags: wgpu::TextureFormatFeatureFlags::empty(),
        }
    }

    #[test]
    fn test_storage_capable_format_accepted() {
        let usages = wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        assert!(check_state_features(&features(usages)).is_ok());
    }

    #[test]
    fn test_sample_only_format_rejected() {
        let usages = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        assert!(matches!(
            check_state_features(&features(usages)),
            Err(GpuError::UnsupportedFormat(wgpu::TextureFormat::Rgba32Float))
        ));
    }

    #[test]
    fn test_unsupported_format_message() {
        let message = GpuError::UnsupportedFormat(STATE_FORMAT).to_string();
        assert!(message.contains("Rgba32Float"), "{message}");
    }
}
