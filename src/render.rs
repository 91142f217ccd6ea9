//! Graphics backend seam and its wgpu implementation.
//!
//! [`Graphics`] is everything the widget needs from a renderer: allocate and
//! release geometry and materials by id, follow the container size, draw one
//! frame, and give the context back. [`GpuGraphics`] implements it with wgpu.
//!
//! # Frame layout
//!
//! Every frame writes the world matrix of each drawable mesh into one instance
//! buffer; mesh `i` is then drawn with instance range `i..i + 1`. Opaque meshes
//! are drawn first with the basic pipeline, translucent ones afterwards,
//! furthest from the camera first.

use std::collections::HashMap;

use cgmath::{EuclideanSpace, InnerSpace};
use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    context::{Context, Target},
    data_structures::{instance::InstanceRaw, scene_graph::Scene},
    error::SceneError,
    host::Size,
    resources::{GeometryId, MaterialId, geometry::GeometryDesc, material::MaterialDesc},
};

pub trait Graphics {
    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<GeometryId, SceneError>;

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId, SceneError>;

    /// Free a geometry. The caller guarantees each id is released once.
    fn release_geometry(&mut self, id: GeometryId);

    /// Free a material. The caller guarantees each id is released once.
    fn release_material(&mut self, id: MaterialId);

    /// Match the render target to the container.
    fn resize(&mut self, size: Size);

    /// Draw `scene` as seen from `camera`, exactly once.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), SceneError>;

    /// Give up the rendering context. Further calls only log or fail.
    fn release_context(&mut self);
}

struct GpuGeometry {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    count: u32,
}

struct GpuMaterial {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    transparent: bool,
}

pub struct GpuGraphics {
    ctx: Option<Context>,
    geometries: HashMap<GeometryId, GpuGeometry>,
    materials: HashMap<MaterialId, GpuMaterial>,
    instance_buffer: Option<wgpu::Buffer>,
    next_id: u32,
}

impl GpuGraphics {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx: Some(ctx),
            geometries: HashMap::new(),
            materials: HashMap::new(),
            instance_buffer: None,
            next_id: 0,
        }
    }

    /// Render into a presentable surface sized to the container.
    pub async fn for_surface(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: Size,
    ) -> Result<Self, SceneError> {
        Context::new(target, size)
            .await
            .map(Self::new)
            .map_err(|e| SceneError::ContextCreation(format!("{e:#}")))
    }

    /// Render into an offscreen texture.
    pub async fn headless(size: Size) -> Result<Self, SceneError> {
        Context::headless(size)
            .await
            .map(Self::new)
            .map_err(|e| SceneError::ContextCreation(format!("{e:#}")))
    }

    pub fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    /// Geometries plus materials currently holding GPU memory.
    pub fn live_resources(&self) -> usize {
        self.geometries.len() + self.materials.len()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn context_released(what: &str) -> SceneError {
        SceneError::ResourceAllocation(format!("cannot create {what}: the context was released"))
    }

    /// Grow the shared instance buffer when the scene has more meshes than
    /// it can hold, then upload this frame's transforms.
    fn upload_instances(&mut self, raws: &[InstanceRaw]) {
        let Some(ctx) = &self.ctx else { return };
        let needed = std::mem::size_of_val(raws) as wgpu::BufferAddress;
        match &self.instance_buffer {
            Some(buffer) if buffer.size() >= needed => {
                ctx.queue.write_buffer(buffer, 0, bytemuck::cast_slice(raws));
            }
            _ => {
                if let Some(old) = self.instance_buffer.take() {
                    old.destroy();
                }
                self.instance_buffer = Some(ctx.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("Instance Buffer"),
                        contents: bytemuck::cast_slice(raws),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
    }

    /// Copy the offscreen target back to the CPU. Only available on headless
    /// contexts.
    #[cfg(feature = "integration-tests")]
    pub async fn read_pixels(&self) -> anyhow::Result<image::RgbaImage> {
        use anyhow::Context as _;

        let ctx = self.ctx.as_ref().context("the context was released")?;
        let Target::Offscreen { texture, .. } = &ctx.target else {
            anyhow::bail!("only headless contexts can be read back");
        };
        let Size { width, height } = ctx.size();
        let u32_size = std::mem::size_of::<u32>() as u32;
        // Buffer rows must be aligned to 256 bytes.
        let unpadded = u32_size * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Readback Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        ctx.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(std::time::Duration::from_secs(3)),
            })
            .context("waiting for the readback copy")?;
        rx.receive()
            .await
            .context("readback channel closed")?
            .context("mapping the readback buffer")?;

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        for row in data.chunks(padded as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        output_buffer.unmap();
        output_buffer.destroy();
        image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong length")
    }
}

impl Graphics for GpuGraphics {
    fn create_geometry(&mut self, desc: &GeometryDesc) -> Result<GeometryId, SceneError> {
        desc.validate()
            .map_err(|e| SceneError::ResourceAllocation(e.to_string()))?;
        let id = GeometryId(self.next_id());
        let ctx = self.ctx.as_ref().ok_or_else(|| Self::context_released("geometry"))?;
        let data = desc.build();
        let vertex = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Vertex Buffer {}", id.0)),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Index Buffer {}", id.0)),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.geometries.insert(
            id,
            GpuGeometry {
                vertex,
                index,
                count: data.indices.len() as u32,
            },
        );
        Ok(id)
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId, SceneError> {
        desc.validate()
            .map_err(|e| SceneError::ResourceAllocation(e.to_string()))?;
        let id = MaterialId(self.next_id());
        let ctx = self.ctx.as_ref().ok_or_else(|| Self::context_released("material"))?;
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Material Buffer {}", id.0)),
                contents: bytemuck::cast_slice(&[desc.to_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.material_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("material_bind_group"),
        });
        self.materials.insert(
            id,
            GpuMaterial {
                buffer,
                bind_group,
                transparent: desc.is_transparent(),
            },
        );
        Ok(id)
    }

    fn release_geometry(&mut self, id: GeometryId) {
        match self.geometries.remove(&id) {
            Some(geometry) => {
                geometry.vertex.destroy();
                geometry.index.destroy();
            }
            None => log::warn!("release of unknown geometry #{}", id.0),
        }
    }

    fn release_material(&mut self, id: MaterialId) {
        match self.materials.remove(&id) {
            Some(material) => material.buffer.destroy(),
            None => log::warn!("release of unknown material #{}", id.0),
        }
    }

    fn resize(&mut self, size: Size) {
        if let Some(ctx) = &mut self.ctx {
            ctx.resize(size);
        }
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), SceneError> {
        let drawables = scene.drawables();
        let raws: Vec<InstanceRaw> = drawables.iter().map(|d| d.world.to_raw()).collect();
        if !raws.is_empty() {
            self.upload_instances(&raws);
        }

        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| SceneError::RenderFailure("the context was released".into()))?;
        ctx.camera.uniform.update_view_proj(camera);
        ctx.queue.write_buffer(
            &ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[ctx.camera.uniform]),
        );
        ctx.light.update(&ctx.queue, scene.lights());

        let output = match &ctx.target {
            Target::Surface { surface, .. } => match surface.get_current_texture() {
                Ok(output) => Some(output),
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    ctx.reconfigure();
                    return Err(SceneError::RenderFailure(
                        "surface lost, reconfigured for the next frame".into(),
                    ));
                }
                Err(e) => return Err(SceneError::RenderFailure(e.to_string())),
            },
            Target::Offscreen { .. } => None,
        };
        let view = match (&output, &ctx.target) {
            (Some(output), _) => output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Target::Offscreen { texture, .. }) => {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
            }
            (None, Target::Surface { .. }) => {
                return Err(SceneError::RenderFailure("no surface texture".into()));
            }
        };

        // Split by pipeline, translucent meshes back to front.
        let eye = camera.eye.to_vec();
        let (mut translucent, opaque): (Vec<usize>, Vec<usize>) = (0..drawables.len())
            .partition(|&i| {
                self.materials
                    .get(&drawables[i].material)
                    .is_some_and(|m| m.transparent)
            });
        translucent.sort_by(|&a, &b| {
            let da = (drawables[a].world.position - eye).magnitude2();
            let db = (drawables[b].world.position - eye).magnitude2();
            db.total_cmp(&da)
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.background().into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if let Some(instances) = &self.instance_buffer {
                render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
                render_pass.set_bind_group(1, &ctx.light.bind_group, &[]);
                render_pass.set_vertex_buffer(1, instances.slice(..));
                for (pipeline, batch) in [
                    (&ctx.pipelines.basic, &opaque),
                    (&ctx.pipelines.transparent, &translucent),
                ] {
                    render_pass.set_pipeline(pipeline);
                    for &i in batch.iter() {
                        let drawable = &drawables[i];
                        let (Some(geometry), Some(material)) = (
                            self.geometries.get(&drawable.geometry),
                            self.materials.get(&drawable.material),
                        ) else {
                            log::warn!("mesh {:?} references released resources", drawable.node);
                            continue;
                        };
                        render_pass.set_bind_group(2, &material.bind_group, &[]);
                        render_pass.set_vertex_buffer(0, geometry.vertex.slice(..));
                        render_pass
                            .set_index_buffer(geometry.index.slice(..), wgpu::IndexFormat::Uint16);
                        render_pass.draw_indexed(0..geometry.count, 0, i as u32..i as u32 + 1);
                    }
                }
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        if let Some(output) = output {
            output.present();
        }
        Ok(())
    }

    fn release_context(&mut self) {
        let Some(ctx) = self.ctx.take() else {
            return;
        };
        if !self.geometries.is_empty() || !self.materials.is_empty() {
            log::warn!(
                "releasing the context with {} resources still allocated",
                self.live_resources()
            );
        }
        for (_, geometry) in self.geometries.drain() {
            geometry.vertex.destroy();
            geometry.index.destroy();
        }
        for (_, material) in self.materials.drain() {
            material.buffer.destroy();
        }
        if let Some(instances) = self.instance_buffer.take() {
            instances.destroy();
        }
        ctx.destroy();
        log::debug!("graphics context released");
    }
}
