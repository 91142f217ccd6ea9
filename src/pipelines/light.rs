//! Scene lights on the GPU.
//!
//! All lights of a scene travel in one uniform: a fixed-size array plus the
//! number of live entries. Ambient lights ignore their position, directional
//! lights treat it as the direction towards the light, point lights attenuate
//! with distance.

use wgpu::util::DeviceExt;

use crate::{config::LightKind, data_structures::scene_graph::Light};

pub const MAX_LIGHTS: usize = 8;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    /// xyz: position or direction, w: kind (0 ambient, 1 directional, 2 point)
    position: [f32; 4],
    /// rgb: colour, a: intensity
    color: [f32; 4],
}

impl From<&Light> for LightRaw {
    fn from(light: &Light) -> Self {
        let kind = match light.kind {
            LightKind::Ambient => 0.0,
            LightKind::Directional => 1.0,
            LightKind::Point => 2.0,
        };
        let [x, y, z] = light.position;
        let [r, g, b] = light.color.to_array();
        Self {
            position: [x, y, z, kind],
            color: [r, g, b, light.intensity],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    lights: [LightRaw; MAX_LIGHTS],
    // Uniforms require 16 byte spacing, so the count is padded to a vec4.
    count: [u32; 4],
}

impl LightUniform {
    /// Lights beyond [`MAX_LIGHTS`] are dropped.
    pub fn from_lights(lights: &[Light]) -> Self {
        let mut uniform = Self {
            lights: [LightRaw::default(); MAX_LIGHTS],
            count: [0; 4],
        };
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights in scene, only the first {} are rendered",
                lights.len(),
                MAX_LIGHTS
            );
        }
        for (slot, light) in uniform.lights.iter_mut().zip(lights) {
            *slot = light.into();
            uniform.count[0] += 1;
        }
        uniform
    }

    pub fn count(&self) -> u32 {
        self.count[0]
    }
}

pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = LightUniform::from_lights(&[]);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, lights: &[Light]) {
        self.uniform = LightUniform::from_lights(lights);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    fn light(kind: LightKind, intensity: f32) -> Light {
        Light {
            kind,
            color: Color::rgb(1.0, 0.5, 0.25),
            intensity,
            position: [1.0, 2.0, 3.0],
        }
    }

    #[test]
    fn packs_kind_and_intensity() {
        let uniform = LightUniform::from_lights(&[
            light(LightKind::Ambient, 0.6),
            light(LightKind::Point, 0.4),
        ]);
        assert_eq!(uniform.count(), 2);
        assert_eq!(uniform.lights[0].position, [1.0, 2.0, 3.0, 0.0]);
        assert_eq!(uniform.lights[1].position[3], 2.0);
        assert_eq!(uniform.lights[1].color, [1.0, 0.5, 0.25, 0.4]);
        assert_eq!(uniform.lights[2], LightRaw::default());
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = vec![light(LightKind::Directional, 1.0); MAX_LIGHTS + 3];
        assert_eq!(LightUniform::from_lights(&lights).count(), MAX_LIGHTS as u32);
    }

    #[test]
    fn uniform_size_is_a_multiple_of_sixteen() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }
}
