//! Per-frame motion of the decorative scene.
//!
//! Two kinds of motion are supported and both are deterministic:
//!
//! - incremental: a [`Spin`] adds a fixed Euler increment to a node's rotation
//!   every frame, so it is locked to the display's frame rate
//! - parametric: [`Orbit`], [`Ring`] and [`Pulse`] are pure functions of the
//!   elapsed time `t` in seconds since the widget became active
//!
//! [`Animator`] binds these to scene nodes and applies them in one step.

use cgmath::{Euler, Quaternion, Rad, Vector3};
use serde::{Deserialize, Serialize};

use crate::data_structures::scene_graph::{NodeId, Scene};

/// Fixed per-frame angular increments in radians about x, y and z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Spin {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Spin {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_still(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Rotation added by a single frame.
    pub fn increment(&self) -> Quaternion<f32> {
        Quaternion::from(Euler::new(Rad(self.x), Rad(self.y), Rad(self.z)))
    }
}

impl From<[f32; 3]> for Spin {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Spin> for [f32; 3] {
    fn from(s: Spin) -> Self {
        [s.x, s.y, s.z]
    }
}

/// A circular path around a pivot that bobs up and down:
/// `(radius·cos ωt, amplitude·sin kωt, radius·sin ωt)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Orbit {
    pub radius: f32,
    /// ω in radians per second.
    pub angular_speed: f32,
    /// k: how many vertical wobbles per revolution.
    pub wobble_ratio: f32,
    pub amplitude: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            radius: 4.0,
            angular_speed: 2.0,
            wobble_ratio: 2.0,
            amplitude: 1.5,
        }
    }
}

impl Orbit {
    pub fn position(&self, t: f32) -> Vector3<f32> {
        let phase = self.angular_speed * t;
        Vector3::new(
            self.radius * phase.cos(),
            self.amplitude * (self.wobble_ratio * phase).sin(),
            self.radius * phase.sin(),
        )
    }
}

/// `count` objects spread evenly on a rotating circle, each bobbing vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ring {
    pub count: usize,
    pub radius: f32,
    pub height: f32,
    pub angular_speed: f32,
    pub bob_speed: f32,
}

impl Default for Ring {
    fn default() -> Self {
        Self {
            count: 5,
            radius: 8.0,
            height: 3.0,
            angular_speed: 0.5,
            bob_speed: 1.0,
        }
    }
}

impl Ring {
    pub fn position(&self, index: usize, t: f32) -> Vector3<f32> {
        let base = index as f32 / self.count.max(1) as f32 * std::f32::consts::TAU;
        let angle = base + self.angular_speed * t;
        Vector3::new(
            angle.cos() * self.radius,
            (angle * 0.5 + self.bob_speed * t).sin() * self.height,
            angle.sin() * self.radius,
        )
    }
}

/// Light intensity oscillating around `base`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pulse {
    pub base: f32,
    pub amplitude: f32,
    pub speed: f32,
}

impl Default for Pulse {
    fn default() -> Self {
        Self {
            base: 1.0,
            amplitude: 0.0,
            speed: 1.0,
        }
    }
}

impl Pulse {
    pub fn intensity(&self, t: f32) -> f32 {
        self.base + self.amplitude * (self.speed * t).sin()
    }
}

#[derive(Debug, Clone)]
enum Track {
    Spin(NodeId, Spin),
    Orbit(NodeId, Orbit),
    Ring(NodeId, Ring, usize),
    Pulse(usize, Pulse),
}

/// The set of motions bound to a scene.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    tracks: Vec<Track>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spin(&mut self, node: NodeId, spin: Spin) {
        if !spin.is_still() {
            self.tracks.push(Track::Spin(node, spin));
        }
    }

    pub fn orbit(&mut self, node: NodeId, orbit: Orbit) {
        self.tracks.push(Track::Orbit(node, orbit));
    }

    pub fn ring(&mut self, node: NodeId, ring: Ring, index: usize) {
        self.tracks.push(Track::Ring(node, ring, index));
    }

    pub fn pulse(&mut self, light: usize, pulse: Pulse) {
        self.tracks.push(Track::Pulse(light, pulse));
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Advance every track by one frame at elapsed time `t` (seconds).
    pub fn step(&self, scene: &mut Scene, t: f32) {
        for track in &self.tracks {
            match track {
                Track::Spin(node, spin) => scene.transform_mut(*node, |local| {
                    local.rotation = local.rotation * spin.increment();
                }),
                Track::Orbit(node, orbit) => {
                    let position = orbit.position(t);
                    scene.transform_mut(*node, |local| local.position = position)
                }
                Track::Ring(node, ring, index) => {
                    let position = ring.position(*index, t);
                    scene.transform_mut(*node, |local| local.position = position)
                }
                Track::Pulse(light, pulse) => {
                    if let Some(light) = scene.lights_mut().get_mut(*light) {
                        light.intensity = pulse.intensity(t);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Rotation};

    use super::*;
    use crate::{
        config::{Color, LightKind},
        data_structures::{instance::Instance, scene_graph::Light},
    };

    const EPS: f32 = 1e-5;

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < EPS
    }

    #[test]
    fn orbit_matches_closed_form() {
        let orbit = Orbit {
            radius: 4.0,
            angular_speed: 2.0,
            wobble_ratio: 2.0,
            amplitude: 1.5,
        };
        for &t in &[0.0_f32, 0.25, 1.0, 3.7] {
            let w = 2.0 * t;
            let expected = Vector3::new(4.0 * w.cos(), 1.5 * (2.0 * w).sin(), 4.0 * w.sin());
            assert!(close(orbit.position(t), expected), "t = {t}");
        }
        assert!(close(orbit.position(0.0), Vector3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn orbit_stays_on_its_radius() {
        let orbit = Orbit::default();
        for i in 0..20 {
            let p = orbit.position(i as f32 * 0.13);
            let horizontal = (p.x * p.x + p.z * p.z).sqrt();
            assert!((horizontal - orbit.radius).abs() < 1e-4);
            assert!(p.y.abs() <= orbit.amplitude + EPS);
        }
    }

    #[test]
    fn ring_spreads_cubes_evenly_at_rest() {
        let ring = Ring::default();
        let first = ring.position(0, 0.0);
        assert!(close(first, Vector3::new(8.0, 0.0, 0.0)));
        let angles: Vec<f32> = (0..ring.count)
            .map(|i| {
                let p = ring.position(i, 0.0);
                p.z.atan2(p.x).rem_euclid(std::f32::consts::TAU)
            })
            .collect();
        for pair in angles.windows(2) {
            assert!((pair[1] - pair[0] - std::f32::consts::TAU / 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn pulse_oscillates_around_base() {
        let pulse = Pulse {
            base: 2.0,
            amplitude: 0.5,
            speed: 3.0,
        };
        assert!((pulse.intensity(0.0) - 2.0).abs() < EPS);
        let peak = std::f32::consts::FRAC_PI_2 / 3.0;
        assert!((pulse.intensity(peak) - 2.5).abs() < EPS);
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let mut scene = Scene::new(Color::WHITE);
        let node = scene.add_group("cube", None, Instance::default());
        let mut animator = Animator::new();
        animator.spin(node, Spin::new(0.0, 0.01, 0.0));
        for _ in 0..100 {
            animator.step(&mut scene, 0.0);
        }
        let rotation = scene.node(node).unwrap().local.rotation;
        let expected = Quaternion::from(Euler::new(Rad(0.0), Rad(1.0), Rad(0.0)));
        let probe = Vector3::unit_x();
        let drift = rotation.rotate_vector(probe) - expected.rotate_vector(probe);
        assert!(drift.magnitude() < 1e-4);
    }

    #[test]
    fn still_spin_adds_no_track() {
        let mut animator = Animator::new();
        animator.spin(NodeId::default(), Spin::default());
        assert!(animator.is_empty());
    }

    #[test]
    fn step_moves_orbit_and_pulses_lights() {
        let mut scene = Scene::new(Color::BLACK);
        let pivot = scene.add_pivot("pivot", None, Instance::default());
        let moon = scene.add_group("moon", Some(pivot), Instance::default());
        let light = scene.add_light(Light {
            kind: LightKind::Point,
            color: Color::WHITE,
            intensity: 1.0,
            position: [0.0; 3],
        });
        let orbit = Orbit::default();
        let pulse = Pulse {
            base: 2.0,
            amplitude: 0.5,
            speed: 3.0,
        };
        let mut animator = Animator::new();
        animator.orbit(moon, orbit);
        animator.pulse(light, pulse);

        animator.step(&mut scene, 1.5);
        assert!(close(scene.node(moon).unwrap().local.position, orbit.position(1.5)));
        assert!((scene.lights()[light].intensity - pulse.intensity(1.5)).abs() < EPS);
    }
}
