//! OctreeIndex - arena of nodes keyed by id, plus cross-cutting state sets.
//!
//! The structure (ids, boxes, links) is fixed once [`build`] returns. Node
//! state fields and the `visible` / `loading` / `loaded` sets mutate for the
//! lifetime of the dataset. Load-state transitions live in `crate::cache`.
//!
//! [`build`]: super::build

use std::collections::{HashMap, HashSet};

use super::bounds::DAabb3;
use super::node::OctreeNode;
use super::NodeId;

/// Spatial index for one point-cloud dataset.
#[derive(Debug)]
pub struct OctreeIndex<P> {
  pub(crate) nodes: HashMap<NodeId, OctreeNode<P>>,
  pub(crate) root_box: DAabb3,
  pub(crate) max_depth: u32,
  /// Visible set of the previous visibility pass.
  pub(crate) visible: HashSet<NodeId>,
  pub(crate) loading: HashSet<NodeId>,
  pub(crate) loaded: HashSet<NodeId>,
}

impl<P> OctreeIndex<P> {
  pub(crate) fn with_root(root_box: DAabb3, max_depth: u32, root_points: u64) -> Self {
    let mut nodes = HashMap::new();
    nodes.insert(NodeId::ROOT, OctreeNode::new(NodeId::ROOT, root_box, root_points));
    Self {
      nodes,
      root_box,
      max_depth,
      visible: HashSet::new(),
      loading: HashSet::new(),
      loaded: HashSet::new(),
    }
  }

  pub fn get(&self, id: NodeId) -> Option<&OctreeNode<P>> {
    self.nodes.get(&id)
  }

  pub fn get_mut(&mut self, id: NodeId) -> Option<&mut OctreeNode<P>> {
    self.nodes.get_mut(&id)
  }

  pub fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(&id)
  }

  pub fn root(&self) -> &OctreeNode<P> {
    &self.nodes[&NodeId::ROOT]
  }

  pub fn root_box(&self) -> DAabb3 {
    self.root_box
  }

  pub fn max_depth(&self) -> u32 {
    self.max_depth
  }

  /// Number of nodes in the arena.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always false: the root exists even for an empty candidate table.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.nodes.keys().copied()
  }

  /// Visible set recorded by the last visibility pass.
  pub fn visible_ids(&self) -> &HashSet<NodeId> {
    &self.visible
  }

  pub fn loading_ids(&self) -> &HashSet<NodeId> {
    &self.loading
  }

  pub fn loaded_ids(&self) -> &HashSet<NodeId> {
    &self.loaded
  }
}
