//! The environment a scene widget is mounted into.
//!
//! A [`Host`] owns the container element (a DOM node on the web, a window
//! natively) and the platform's frame and resize scheduling. The widget only
//! talks to the platform through this trait.

use std::time::Duration;

use crate::error::SceneError;

/// Container dimensions in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Collapsed dimensions count as one pixel so projections and render
    /// targets stay valid.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }

    pub fn aspect(self) -> f32 {
        let Size { width, height } = self.clamped();
        width as f32 / height as f32
    }

    pub fn is_collapsed(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<[u32; 2]> for Size {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Size> for [u32; 2] {
    fn from(size: Size) -> Self {
        [size.width, size.height]
    }
}

/// Identifies one scheduled animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Identifies one registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

pub trait Host {
    /// Whether a 3D rendering context can be created at all. Checked before
    /// anything is allocated.
    fn supports_3d(&self) -> bool;

    fn container_size(&self) -> Size;

    /// Insert the drawing surface into the container.
    fn attach_surface(&mut self) -> Result<(), SceneError>;

    /// Remove the drawing surface from the container. Only called while it is
    /// attached.
    fn detach_surface(&mut self) -> Result<(), SceneError>;

    fn surface_attached(&self) -> bool;

    /// Schedule one callback before the next repaint. The callback arrives as
    /// a call to the widget's `on_frame` with the returned handle.
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Start delivering container resizes to the widget's `on_resize`.
    fn add_resize_listener(&mut self) -> Result<ListenerHandle, SceneError>;

    fn remove_resize_listener(&mut self, handle: ListenerHandle) -> Result<(), SceneError>;

    /// Monotonic clock.
    fn now(&self) -> Duration;
}
