//! OctreeNode - one arena entry of the spatial index.
//!
//! Nodes never reference each other directly; parent and children are
//! stored as ids and resolved through the owning [`OctreeIndex`].
//!
//! [`OctreeIndex`]: super::OctreeIndex

use smallvec::SmallVec;

use super::bounds::{BoundingSphere, DAabb3};
use super::NodeId;

/// Load state of a node's payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LoadState {
  #[default]
  Unloaded,
  Loading,
  Loaded,
}

/// Octree node. `P` is the renderer's payload handle.
#[derive(Debug)]
pub struct OctreeNode<P> {
  pub id: NodeId,
  /// Render-space box. Fixed after construction.
  pub bounding_box: DAabb3,
  /// Derived from `bounding_box` once at construction.
  pub bounding_sphere: BoundingSphere,
  /// Point count from the candidate table (budget hint, never recomputed).
  pub point_count: u64,
  pub parent: Option<NodeId>,
  /// Existing children in octant order.
  pub children: SmallVec<[NodeId; 8]>,
  /// Camera visibility, independent of load state.
  pub visible: bool,
  pub(crate) load_state: LoadState,
  pub(crate) payload: Option<P>,
}

impl<P> OctreeNode<P> {
  pub(crate) fn new(id: NodeId, bounding_box: DAabb3, point_count: u64) -> Self {
    Self {
      id,
      bounding_box,
      bounding_sphere: bounding_box.bounding_sphere(),
      point_count,
      parent: id.parent(),
      children: SmallVec::new(),
      visible: false,
      load_state: LoadState::Unloaded,
      payload: None,
    }
  }

  pub fn load_state(&self) -> LoadState {
    self.load_state
  }

  /// Loaded payload, present only in [`LoadState::Loaded`].
  pub fn payload(&self) -> Option<&P> {
    self.payload.as_ref()
  }

  pub fn payload_mut(&mut self) -> Option<&mut P> {
    self.payload.as_mut()
  }

  pub fn depth(&self) -> u32 {
    self.id.depth()
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }
}
