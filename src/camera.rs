//! Perspective camera and its uniform.
//!
//! Field of view and clip planes are fixed when the camera is built; only the
//! aspect ratio changes afterwards, whenever the container is resized.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Rad, Vector3};

use crate::{config::CameraConfig, host::Size};

/// cgmath produces OpenGL clip space (z in -1..1); wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
    aspect: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, viewport: Size) -> Self {
        let mut camera = Self {
            eye: Point3::new(0.0, config.height, config.distance),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: Deg(config.fov_deg).into(),
            znear: config.near,
            zfar: config.far,
            aspect: 1.0,
        };
        camera.set_viewport(viewport);
        camera
    }

    /// Recompute the aspect ratio from the viewport. Collapsed dimensions count
    /// as one pixel.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.aspect = viewport.aspect();
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.eye.to_homogeneous().into();
        self.view_proj = camera.view_projection().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector4;

    use super::*;

    fn assert_close(a: f32, b: f32, epsilon: f32) {
        assert!((a - b).abs() <= epsilon, "{a} != {b}");
    }

    #[test]
    fn aspect_follows_viewport() {
        let mut camera = Camera::new(&CameraConfig::default(), Size::new(800, 600));
        assert_close(camera.aspect(), 800.0 / 600.0, 1e-6);
        camera.set_viewport(Size::new(300, 600));
        assert_close(camera.aspect(), 0.5, 1e-6);
    }

    #[test]
    fn collapsed_viewport_does_not_divide_by_zero() {
        let camera = Camera::new(&CameraConfig::default(), Size::new(640, 0));
        assert!(camera.aspect().is_finite());
        assert_close(camera.aspect(), 640.0, 1e-6);
    }

    #[test]
    fn clip_planes_are_fixed_at_construction() {
        let config = CameraConfig {
            fov_deg: 60.0,
            near: 0.5,
            far: 50.0,
            ..Default::default()
        };
        let mut camera = Camera::new(&config, Size::new(100, 100));
        camera.set_viewport(Size::new(1920, 1080));
        assert_eq!(camera.znear(), 0.5);
        assert_eq!(camera.zfar(), 50.0);
        assert_close(camera.fovy().0, 60.0_f32.to_radians(), 1e-6);
    }

    #[test]
    fn target_projects_to_the_centre_in_wgpu_depth_range() {
        let camera = Camera::new(&CameraConfig::default(), Size::new(800, 600));
        let clip = camera.view_projection() * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert_close(ndc.x, 0.0, 1e-6);
        assert_close(ndc.y, 0.0, 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
