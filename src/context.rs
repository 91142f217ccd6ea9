//! GPU context: device, queue, render target and the per-scene uniforms.
//!
//! The target is either a presentable surface (a canvas or a window) or an
//! offscreen texture that can be copied back to the CPU.

use anyhow::Context as _;
use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    data_structures::texture,
    host::Size,
    pipelines::{Pipelines, basic::mk_material_bind_group_layout, light::LightResources},
};

pub(crate) enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
    },
}

pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub(crate) target: Target,
    pub(crate) depth_texture: texture::Texture,
    pub camera: CameraResources,
    pub light: LightResources,
    pub(crate) material_bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) pipelines: Pipelines,
    size: Size,
}

impl Context {
    /// Build a context that presents to `target` (a canvas on the web, a
    /// window natively).
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: Size,
    ) -> anyhow::Result<Self> {
        let size = size.clamped();
        log::debug!("WGPU setup");
        let instance = mk_instance();
        let surface = instance
            .create_surface(target)
            .context("creating the render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter can present to this surface")?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes sRGB colours; a linear surface would darken everything.
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self::assemble(
            device,
            queue,
            Target::Surface { surface, config },
            size,
        ))
    }

    /// Build a context that renders into a texture instead of presenting.
    pub async fn headless(size: Size) -> anyhow::Result<Self> {
        let size = size.clamped();
        let instance = mk_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter available")?;
        let (device, queue) = request_device(&adapter).await?;
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = mk_offscreen_texture(&device, format, size);
        Ok(Self::assemble(
            device,
            queue,
            Target::Offscreen { texture, format },
            size,
        ))
    }

    fn assemble(device: wgpu::Device, queue: wgpu::Queue, target: Target, size: Size) -> Self {
        let color_format = match &target {
            Target::Surface { config, .. } => config.format,
            Target::Offscreen { format, .. } => *format,
        };
        let camera = CameraResources::new(&device);
        let light = LightResources::new(&device);
        let material_bind_group_layout = mk_material_bind_group_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            color_format,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &material_bind_group_layout,
        );
        let depth_texture =
            texture::Texture::create_depth_texture(&device, size.into(), "depth_texture");
        Self {
            device,
            queue,
            target,
            depth_texture,
            camera,
            light,
            material_bind_group_layout,
            pipelines,
            size,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.target, Target::Offscreen { .. })
    }

    /// Resize the render target and depth buffer. Collapsed sizes become one
    /// pixel.
    pub fn resize(&mut self, size: Size) {
        let size = size.clamped();
        if size == self.size {
            return;
        }
        self.size = size;
        match &mut self.target {
            Target::Surface { surface, config } => {
                config.width = size.width;
                config.height = size.height;
                surface.configure(&self.device, config);
            }
            Target::Offscreen { texture, format } => {
                texture.destroy();
                *texture = mk_offscreen_texture(&self.device, *format, size);
            }
        }
        self.depth_texture.destroy();
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, size.into(), "depth_texture");
    }

    /// Re-apply the surface configuration after the surface was lost.
    pub(crate) fn reconfigure(&self) {
        if let Target::Surface { surface, config } = &self.target {
            surface.configure(&self.device, config);
        }
    }

    /// Free GPU memory held by the context itself.
    pub(crate) fn destroy(&self) {
        self.depth_texture.destroy();
        self.camera.buffer.destroy();
        self.light.buffer.destroy();
        if let Target::Offscreen { texture, .. } = &self.target {
            texture.destroy();
        }
    }
}

fn mk_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_arch = "wasm32"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_arch = "wasm32")]
        backends: wgpu::Backends::GL,
        ..Default::default()
    })
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    log::debug!("device and queue");
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("deco-scene device"),
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await
        .context("requesting a graphics device")
}

fn mk_offscreen_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    size: Size,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}
