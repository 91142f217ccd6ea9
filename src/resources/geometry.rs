//! Geometry descriptors and CPU-side vertex generation.

use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Describes a vertex buffer layout for the render pipeline.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Shape of a primitive. Planes lie in the XY plane facing +Z; rotate them to
/// use as floors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryDesc {
    Box { width: f32, height: f32, depth: f32 },
    Plane { width: f32, height: f32 },
}

impl Default for GeometryDesc {
    fn default() -> Self {
        Self::cube(1.0)
    }
}

/// Triangle-list mesh data with counter-clockwise front faces.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u16>,
}

impl GeometryDesc {
    pub fn cube(edge: f32) -> Self {
        Self::Box {
            width: edge,
            height: edge,
            depth: edge,
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        let dims = match *self {
            GeometryDesc::Box {
                width,
                height,
                depth,
            } => vec![width, height, depth],
            GeometryDesc::Plane { width, height } => vec![width, height],
        };
        if dims.iter().all(|d| d.is_finite() && *d > 0.0) {
            Ok(())
        } else {
            Err(SceneError::Config(format!(
                "geometry {:?} needs positive, finite dimensions",
                self
            )))
        }
    }

    pub fn build(&self) -> MeshData {
        let mut data = MeshData {
            vertices: Vec::new(),
            indices: Vec::new(),
        };
        match *self {
            GeometryDesc::Box {
                width,
                height,
                depth,
            } => {
                let half = [width / 2.0, height / 2.0, depth / 2.0];
                // (normal, u, v) with u x v == normal so quads wind counter-clockwise.
                const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
                    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
                    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
                    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
                    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
                    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
                ];
                let extent = |axis: [f32; 3]| {
                    axis[0].abs() * half[0] + axis[1].abs() * half[1] + axis[2].abs() * half[2]
                };
                for (normal, u, v) in FACES {
                    push_quad(&mut data, normal, u, v, extent(normal), extent(u), extent(v));
                }
            }
            GeometryDesc::Plane { width, height } => push_quad(
                &mut data,
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                0.0,
                width / 2.0,
                height / 2.0,
            ),
        }
        data
    }
}

fn push_quad(
    data: &mut MeshData,
    normal: [f32; 3],
    u: [f32; 3],
    v: [f32; 3],
    offset: f32,
    half_u: f32,
    half_v: f32,
) {
    let base = data.vertices.len() as u16;
    for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        let position = std::array::from_fn(|i| {
            normal[i] * offset + u[i] * su * half_u + v[i] * sv * half_v
        });
        data.vertices.push(ModelVertex { position, normal });
    }
    data.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    fn triangle_normal(data: &MeshData, tri: &[u16]) -> Vector3<f32> {
        let p = |i: u16| Vector3::from(data.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn box_has_six_outward_faces() {
        let data = GeometryDesc::Box {
            width: 2.0,
            height: 4.0,
            depth: 6.0,
        }
        .build();
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);
        for v in &data.vertices {
            let p = Vector3::from(v.position);
            assert!(p.dot(Vector3::from(v.normal)) > 0.0);
            assert_eq!(p.x.abs(), 1.0);
            assert_eq!(p.y.abs(), 2.0);
            assert_eq!(p.z.abs(), 3.0);
        }
    }

    #[test]
    fn winding_agrees_with_normals() {
        for desc in [
            GeometryDesc::cube(2.5),
            GeometryDesc::Plane {
                width: 10.0,
                height: 10.0,
            },
        ] {
            let data = desc.build();
            for tri in data.indices.chunks(3) {
                let face = triangle_normal(&data, tri);
                let normal = Vector3::from(data.vertices[tri[0] as usize].normal);
                assert!(face.dot(normal) > 0.0, "{desc:?}");
            }
        }
    }

    #[test]
    fn plane_faces_positive_z() {
        let data = GeometryDesc::Plane {
            width: 2.0,
            height: 1.0,
        }
        .build();
        assert_eq!(data.vertices.len(), 4);
        assert!(data.vertices.iter().all(|v| v.position[2] == 0.0 && v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        assert!(GeometryDesc::cube(0.0).validate().is_err());
        assert!(GeometryDesc::Plane {
            width: 1.0,
            height: f32::NAN
        }
        .validate()
        .is_err());
        assert!(GeometryDesc::cube(1.0).validate().is_ok());
    }
}
