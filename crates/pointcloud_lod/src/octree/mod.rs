//! Octree spatial index for point-cloud LOD streaming.
//!
//! The tree is an arena of nodes keyed by [`NodeId`]. Ids encode the path
//! from the root, so parent/child relationships are plain id arithmetic and
//! no node ever holds a reference to another.
//!
//! # Id Convention
//!
//! ```text
//! root          = 1
//! child(id, o)  = id * 10 + o + 1        (o = octant 0..8)
//! depth(id)     = digits(id) - 1
//! parent(id)    = id / 10
//! ```
//!
//! # Module Structure
//!
//! - [`node_id`]: `NodeId` - path code value type
//! - [`bounds`]: `DAabb3`, `BoundingSphere`
//! - [`node`]: `OctreeNode` - arena entry with load state and payload
//! - [`index`]: `OctreeIndex` - the arena plus visible/loading/loaded sets
//! - [`builder`]: one-shot construction from a candidate table

pub mod bounds;
pub mod builder;
pub mod index;
pub mod node;
pub mod node_id;

// Re-exports
pub use bounds::{BoundingSphere, DAabb3};
pub use builder::{build, CandidateTable};
pub use index::OctreeIndex;
pub use node::{LoadState, OctreeNode};
pub use node_id::{NodeId, MAX_SUPPORTED_DEPTH};
