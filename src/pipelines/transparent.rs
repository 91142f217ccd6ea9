use crate::{
    data_structures::{instance::InstanceRaw, texture::Texture},
    pipelines::basic::{mk_render_pipeline, scene_shader},
    resources::geometry::{ModelVertex, Vertex},
};

/// Meshes whose material opacity is below one.
///
/// Blends over whatever is already in the target, tests against the depth
/// buffer without writing to it and keeps both faces so a floor seen from
/// below still shows.
pub fn mk_transparent_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        layout,
        color_format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(Texture::DEPTH_FORMAT),
        false,
        None,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        scene_shader(),
    )
}
