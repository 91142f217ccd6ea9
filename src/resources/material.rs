//! Surface appearance of a primitive.

use serde::{Deserialize, Serialize};

use crate::{config::Color, error::SceneError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
    /// Below 1.0 the material is drawn with alpha blending after opaque meshes.
    pub opacity: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self::solid(Color::WHITE)
    }
}

impl MaterialDesc {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            emissive: Color::BLACK,
            emissive_intensity: 0.0,
            metalness: 0.0,
            roughness: 1.0,
            opacity: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(SceneError::Config(format!("material {name} {v} is outside 0..=1")))
            }
        };
        unit("opacity", self.opacity)?;
        unit("metalness", self.metalness)?;
        unit("roughness", self.roughness)?;
        if self.emissive_intensity < 0.0 {
            return Err(SceneError::Config(
                "material emissive_intensity must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let [r, g, b] = self.color.to_array();
        let [er, eg, eb] = self.emissive.scaled(self.emissive_intensity).to_array();
        MaterialUniform {
            color: [r, g, b, self.opacity],
            emissive: [er, eg, eb, 0.0],
            params: [self.metalness, self.roughness, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    /// x: metalness, y: roughness
    pub params: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_carries_opacity_and_scaled_emissive() {
        let material = MaterialDesc {
            emissive: Color::rgb(1.0, 0.5, 0.0),
            emissive_intensity: 0.5,
            opacity: 0.15,
            ..MaterialDesc::solid(Color::BLACK)
        };
        let uniform = material.to_uniform();
        assert_eq!(uniform.color, [0.0, 0.0, 0.0, 0.15]);
        assert_eq!(uniform.emissive, [0.5, 0.25, 0.0, 0.0]);
        assert!(material.is_transparent());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let mut material = MaterialDesc::default();
        material.opacity = 1.5;
        assert!(material.validate().is_err());
        material.opacity = 1.0;
        material.roughness = -0.1;
        assert!(material.validate().is_err());
    }
}
