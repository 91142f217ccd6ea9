//! deco-scene
//!
//! A small decorative 3D scene widget: a slowly spinning centrepiece, a cube
//! orbiting it, soft lights, mounted into a web page container or a native
//! window. The widget owns everything it allocates and tears it all down on
//! unmount, so it can be mounted and removed repeatedly without leaking GPU
//! memory, frame callbacks or event listeners.
//!
//! High-level modules
//! - `widget`: the lifecycle state machine (mount, frame step, resize, unmount)
//! - `host`: the seam to the hosting environment (container, frames, resizes)
//! - `render`: the seam to the graphics backend and its wgpu implementation
//! - `config`: declarative scene description, TOML loading and presets
//! - `animation`: spins, orbits, rings and light pulses
//! - `camera`: perspective camera and its uniform
//! - `context`: GPU device, queue and render target
//! - `data_structures`: scene graph, transforms, depth texture
//! - `pipelines`: opaque and translucent render pipelines, lights
//! - `resources`: geometry and material descriptors and the release ledger
//! - `flow` (native) / `web` (wasm32): drivers binding the widget to winit or
//!   to the DOM
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod flow;
pub mod host;
pub mod pipelines;
pub mod render;
pub mod resources;
#[cfg(target_arch = "wasm32")]
pub mod web;
pub mod widget;

pub use config::SceneConfig;
pub use error::SceneError;
pub use host::{FrameHandle, Host, ListenerHandle, Size};
pub use render::{GpuGraphics, Graphics};
pub use widget::{SceneWidget, Status};
