//! Render pipelines.
//!
//! Both pipelines share one shader and one layout: camera at group 0, lights at
//! group 1, the mesh material at group 2. They differ only in blending, depth
//! writes and culling.

pub mod basic;
pub mod light;
pub mod transparent;

pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
        material_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = basic::mk_scene_pipeline_layout(
            device,
            camera_bind_group_layout,
            light_bind_group_layout,
            material_bind_group_layout,
        );
        Self {
            basic: basic::mk_basic_pipeline(device, color_format, &layout),
            transparent: transparent::mk_transparent_pipeline(device, color_format, &layout),
        }
    }
}
