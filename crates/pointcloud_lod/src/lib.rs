//! pointcloud_lod - Framework/engine independent point-cloud LOD streaming
//!
//! This crate decides which nodes of a point-cloud octree are worth drawing
//! from the current camera, fetches the missing ones with bounded
//! concurrency, and keeps the renderer's shown/hidden state in sync.
//!
//! # Features
//!
//! - **Octree index**: built once per dataset from a flat `id → point count`
//!   table; ids encode the path from the root
//! - **Visibility**: frustum test plus screen-space size LOD, with optional
//!   point budget and subtree pruning
//! - **Load scheduling**: coarse-to-fine priority queue drained by a paced
//!   pump onto a dedicated rayon pool (or inline, for hosts without threads)
//! - **Render state**: hide/show deltas per camera change and a global
//!   enable switch
//!
//! # Example
//!
//! ```ignore
//! use pointcloud_lod::{CameraState, LodConfig, LodEngine};
//!
//! let mut engine = LodEngine::new(my_loader, my_renderer, LodConfig::default())?;
//! engine.load_dataset(root_box, &candidates)?;
//!
//! // Each frame
//! engine.update_camera(&CameraState::look_at(eye, target, fov_y, viewport, 0.1, 1e4))?;
//! engine.update();
//! ```

pub mod cache;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod octree;
pub mod render_state;
pub mod scheduler;
pub mod stats;
pub mod visibility;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used items
pub use camera::{CameraState, Frustum, Plane};
pub use config::{LoadExecution, LodConfig, MIN_VISIBLE_NODE_SIZE_PX};
pub use engine::LodEngine;
pub use error::LodError;
pub use host::{NodeLoader, NodeRenderer};
pub use octree::{
  build, BoundingSphere, CandidateTable, DAabb3, LoadState, NodeId, OctreeIndex, OctreeNode,
  MAX_SUPPORTED_DEPTH,
};
pub use render_state::RenderStateController;
pub use scheduler::{LoadEvent, LoadScheduler};
pub use stats::{EngineStats, RollingWindow};
pub use visibility::{screen_radius, update_visibility, VisibleSet};
