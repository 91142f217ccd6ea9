//! Declarative scene configuration.
//!
//! A [`SceneConfig`] enumerates everything that differs between variants of the
//! decorative scene: the primitive set, the palette, the lights, the camera
//! framing and the optional orbiting cube / floating ring. Every field has a
//! default, so a TOML document only needs to mention what it changes.
//!
//! ```toml
//! background = "#FFFFFF"
//!
//! [camera]
//! distance = 6.0
//!
//! [[meshes]]
//! name = "cube"
//! spin = [0.005, 0.01, 0.0]
//! geometry = { box = { width = 2.5, height = 2.5, depth = 2.5 } }
//! material = { color = "#1B998B", metalness = 0.6, roughness = 0.2 }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    animation::{Orbit, Pulse, Ring, Spin},
    error::SceneError,
    resources::{geometry::GeometryDesc, material::MaterialDesc},
};

/// An sRGB colour with components in `0.0..=1.0`, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub fn to_hex(self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::rgb(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl TryFrom<String> for Color {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for Color {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| SceneError::Config(format!("colour `{s}` must start with `#`")))?;
        if digits.len() != 6 {
            return Err(SceneError::Config(format!(
                "colour `{s}` must have exactly six hex digits"
            )));
        }
        u32::from_str_radix(digits, 16)
            .map(Color::from_hex)
            .map_err(|_| SceneError::Config(format!("colour `{s}` is not valid hex")))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_hex())
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: 1.0,
        }
    }
}

/// Perspective framing. The camera sits at `(0, height, distance)` and looks at
/// the origin; field of view and clip planes never change after mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub distance: f32,
    pub height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 1000.0,
            distance: 6.0,
            height: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub position: [f32; 3],
    pub pulse: Option<Pulse>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            kind: LightKind::Ambient,
            color: Color::WHITE,
            intensity: 1.0,
            position: [0.0; 3],
            pulse: None,
        }
    }
}

/// A named transform node meshes can be parented to. The whole group spins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub name: String,
    pub position: [f32; 3],
    pub spin: Spin,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: "group".to_string(),
            position: [0.0; 3],
            spin: Spin::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub name: String,
    /// Name of the [`GroupConfig`] this mesh belongs to; the scene root otherwise.
    pub group: Option<String>,
    pub geometry: GeometryDesc,
    pub material: MaterialDesc,
    pub position: [f32; 3],
    /// Initial Euler rotation in radians.
    pub rotation: [f32; 3],
    pub spin: Spin,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            name: "mesh".to_string(),
            group: None,
            geometry: GeometryDesc::default(),
            material: MaterialDesc::default(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            spin: Spin::default(),
        }
    }
}

/// A cube travelling around a pivot on an [`Orbit`] path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    #[serde(flatten)]
    pub path: Orbit,
    pub pivot: [f32; 3],
    pub size: f32,
    pub material: MaterialDesc,
    pub spin: Spin,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            path: Orbit::default(),
            pivot: [0.0; 3],
            size: 0.5,
            material: MaterialDesc::solid(Color::BLACK),
            spin: Spin::new(0.03, 0.03, 0.0),
        }
    }
}

/// Cubes floating on a shared [`Ring`] path. They share one geometry and one
/// material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    #[serde(flatten)]
    pub path: Ring,
    pub size: f32,
    pub material: MaterialDesc,
    pub spin: Spin,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            path: Ring::default(),
            size: 0.3,
            material: MaterialDesc::solid(Color::from_hex(0x00ffff)),
            spin: Spin::new(0.02, 0.02, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub background: Color,
    pub camera: CameraConfig,
    pub lights: Vec<LightConfig>,
    pub groups: Vec<GroupConfig>,
    pub meshes: Vec<MeshConfig>,
    pub orbit: Option<OrbitConfig>,
    pub ring: Option<RingConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::spinning_cube()
    }
}

const EMERALD: u32 = 0x1B998B;

impl SceneConfig {
    /// A glossy emerald cube on a white page with a faint floor beneath it.
    pub fn spinning_cube() -> Self {
        Self {
            background: Color::WHITE,
            camera: CameraConfig::default(),
            lights: vec![
                LightConfig {
                    kind: LightKind::Ambient,
                    color: Color::WHITE,
                    intensity: 0.6,
                    ..Default::default()
                },
                LightConfig {
                    kind: LightKind::Directional,
                    color: Color::from_hex(EMERALD),
                    intensity: 1.0,
                    position: [5.0, 5.0, 5.0],
                    pulse: None,
                },
                LightConfig {
                    kind: LightKind::Point,
                    color: Color::BLACK,
                    intensity: 0.4,
                    position: [-3.0, -2.0, -4.0],
                    pulse: None,
                },
            ],
            groups: Vec::new(),
            meshes: vec![
                MeshConfig {
                    name: "cube".to_string(),
                    geometry: GeometryDesc::cube(2.5),
                    material: MaterialDesc {
                        color: Color::from_hex(EMERALD),
                        metalness: 0.6,
                        roughness: 0.2,
                        emissive: Color::from_hex(0x0f0f0f),
                        emissive_intensity: 0.2,
                        opacity: 1.0,
                    },
                    spin: Spin::new(0.005, 0.01, 0.0),
                    ..Default::default()
                },
                MeshConfig {
                    name: "floor".to_string(),
                    geometry: GeometryDesc::Plane {
                        width: 10.0,
                        height: 10.0,
                    },
                    material: MaterialDesc {
                        opacity: 0.15,
                        ..MaterialDesc::solid(Color::BLACK)
                    },
                    position: [0.0, -2.0, 0.0],
                    rotation: [-std::f32::consts::FRAC_PI_2, 0.0, 0.0],
                    ..Default::default()
                },
            ],
            orbit: None,
            ring: None,
        }
    }

    /// A retro computer turning slowly, with a pulsing screen glow, a ring of
    /// floating cyan cubes and a small black cube orbiting it.
    pub fn cyber_computer() -> Self {
        let cyan = Color::from_hex(0x00ffff);
        let chassis = MaterialDesc {
            metalness: 0.8,
            roughness: 0.3,
            ..MaterialDesc::solid(Color::from_hex(0x1a1a1a))
        };
        let part = |name: &str, geometry: GeometryDesc, material: MaterialDesc, y: f32, z: f32| {
            MeshConfig {
                name: name.to_string(),
                group: Some("computer".to_string()),
                geometry,
                material,
                position: [0.0, y, z],
                ..Default::default()
            }
        };
        Self {
            background: Color::from_hex(0x0a0a0a),
            camera: CameraConfig {
                distance: 12.0,
                height: 2.0,
                ..Default::default()
            },
            lights: vec![
                LightConfig {
                    kind: LightKind::Ambient,
                    color: Color::WHITE,
                    intensity: 0.4,
                    ..Default::default()
                },
                LightConfig {
                    kind: LightKind::Directional,
                    color: cyan,
                    intensity: 1.0,
                    position: [5.0, 5.0, 5.0],
                    pulse: None,
                },
                LightConfig {
                    kind: LightKind::Point,
                    color: cyan,
                    intensity: 2.0,
                    position: [0.0, 0.6, 2.0],
                    pulse: Some(Pulse {
                        base: 2.0,
                        amplitude: 0.5,
                        speed: 3.0,
                    }),
                },
            ],
            groups: vec![GroupConfig {
                name: "computer".to_string(),
                position: [0.0; 3],
                spin: Spin::new(0.0, 0.005, 0.0),
            }],
            meshes: vec![
                part(
                    "case",
                    GeometryDesc::Box {
                        width: 3.0,
                        height: 2.0,
                        depth: 0.3,
                    },
                    chassis.clone(),
                    0.6,
                    0.0,
                ),
                part(
                    "screen",
                    GeometryDesc::Plane {
                        width: 2.6,
                        height: 1.6,
                    },
                    MaterialDesc {
                        emissive: cyan,
                        emissive_intensity: 0.6,
                        ..MaterialDesc::solid(Color::from_hex(0x003333))
                    },
                    0.6,
                    0.16,
                ),
                part(
                    "stand",
                    GeometryDesc::Box {
                        width: 0.3,
                        height: 0.8,
                        depth: 0.3,
                    },
                    chassis.clone(),
                    -0.8,
                    0.0,
                ),
                part(
                    "base",
                    GeometryDesc::Box {
                        width: 1.5,
                        height: 0.1,
                        depth: 1.0,
                    },
                    chassis,
                    -1.2,
                    0.0,
                ),
            ],
            orbit: Some(OrbitConfig::default()),
            ring: Some(RingConfig::default()),
        }
    }

    /// Look up a preset by name (`spinning-cube` or `cyber-computer`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "spinning-cube" | "spinning_cube" | "cube" => Some(Self::spinning_cube()),
            "cyber-computer" | "cyber_computer" | "computer" => Some(Self::cyber_computer()),
            _ => None,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, SceneError> {
        let config: SceneConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene config {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("parsing scene config {}", path.display()))
    }

    /// Reject configurations the lifecycle cannot honour.
    pub fn validate(&self) -> Result<(), SceneError> {
        let cam = &self.camera;
        if !(cam.fov_deg > 0.0 && cam.fov_deg < 180.0) {
            return Err(SceneError::Config(format!(
                "camera fov {} must be between 0 and 180 degrees",
                cam.fov_deg
            )));
        }
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return Err(SceneError::Config(format!(
                "camera clip planes must satisfy 0 < near < far, got near {} far {}",
                cam.near, cam.far
            )));
        }
        for mesh in &self.meshes {
            if let Some(group) = &mesh.group {
                if !self.groups.iter().any(|g| &g.name == group) {
                    return Err(SceneError::Config(format!(
                        "mesh `{}` references unknown group `{}`",
                        mesh.name, group
                    )));
                }
            }
            mesh.geometry.validate()?;
            mesh.material.validate()?;
        }
        if let Some(orbit) = &self.orbit {
            if orbit.size <= 0.0 {
                return Err(SceneError::Config("orbit cube size must be positive".into()));
            }
            orbit.material.validate()?;
        }
        if let Some(ring) = &self.ring {
            if ring.path.count == 0 || ring.size <= 0.0 {
                return Err(SceneError::Config(
                    "ring needs at least one cube of positive size".into(),
                ));
            }
            ring.material.validate()?;
        }
        if self.lights.len() > crate::pipelines::light::MAX_LIGHTS {
            return Err(SceneError::Config(format!(
                "at most {} lights are supported",
                crate::pipelines::light::MAX_LIGHTS
            )));
        }
        Ok(())
    }
}
