//! Scene data structures.
//!
//! - `instance` holds node transforms and their GPU layout
//! - `scene_graph` is the arena of groups, pivots and meshes plus the lights
//! - `texture` wraps the depth buffer

pub mod instance;
pub mod scene_graph;
pub mod texture;
