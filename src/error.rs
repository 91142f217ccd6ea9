//! Error kinds surfaced by the scene widget.
//!
//! Only [`SceneError::RenderFailure`] is recoverable: the frame loop logs it and
//! keeps going. Every other kind either ends a mount attempt (and is reported
//! through [`crate::widget::Status::Error`]) or is logged during teardown.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("3D rendering is not supported by the hosting environment")]
    CapabilityUnavailable,
    #[error("failed to create the graphics context: {0}")]
    ContextCreation(String),
    #[error("failed to allocate a graphics resource: {0}")]
    ResourceAllocation(String),
    #[error("failed to attach the render surface: {0}")]
    SurfaceAttach(String),
    #[error("failed to detach the render surface: {0}")]
    SurfaceDetach(String),
    #[error("resize listener error: {0}")]
    Listener(String),
    #[error("frame render failed: {0}")]
    RenderFailure(String),
    #[error("invalid scene configuration: {0}")]
    Config(String),
}

impl SceneError {
    /// Whether the frame loop may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SceneError::RenderFailure(_))
    }
}

impl From<toml::de::Error> for SceneError {
    fn from(e: toml::de::Error) -> Self {
        SceneError::Config(e.to_string())
    }
}
