//! Display state of loaded payloads.
//!
//! Camera visibility and display are separate: a node can be visible but not
//! loaded yet (nothing to show), or loaded but outside the view (hidden).
//! The controller also carries a global `enabled` switch; while disabled no
//! payload is shown, whatever the camera sees.

use std::collections::HashSet;

use crate::host::NodeRenderer;
use crate::octree::{NodeId, OctreeIndex, OctreeNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStateController {
  enabled: bool,
}

impl Default for RenderStateController {
  fn default() -> Self {
    Self { enabled: true }
  }
}

impl RenderStateController {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Hide payloads of nodes that left the visible set and show loaded nodes
  /// in the current one.
  pub fn apply_visibility_delta<R: NodeRenderer>(
    &self,
    index: &mut OctreeIndex<R::Handle>,
    renderer: &mut R,
    previous: &HashSet<NodeId>,
    current: &HashSet<NodeId>,
  ) {
    for id in previous.difference(current) {
      if let Some(handle) = index.get_mut(*id).and_then(OctreeNode::payload_mut) {
        renderer.set_visible(handle, false);
      }
    }
    for id in current {
      if let Some(handle) = index.get_mut(*id).and_then(OctreeNode::payload_mut) {
        renderer.set_visible(handle, self.enabled);
      }
    }
  }

  /// Apply the current display state to a node that just finished loading.
  pub fn present<R: NodeRenderer>(&self, node: &mut OctreeNode<R::Handle>, renderer: &mut R) {
    let show = self.enabled && node.visible;
    if let Some(handle) = node.payload_mut() {
      renderer.set_visible(handle, show);
    }
  }

  /// Enable display and show the loaded payloads of visible nodes.
  ///
  /// Loaded nodes outside the last visibility pass stay hidden.
  pub fn all_show<R: NodeRenderer>(&mut self, index: &mut OctreeIndex<R::Handle>, renderer: &mut R) {
    self.enabled = true;
    self.present_loaded(index, renderer);
  }

  /// Disable display and hide every loaded payload.
  pub fn all_hide<R: NodeRenderer>(&mut self, index: &mut OctreeIndex<R::Handle>, renderer: &mut R) {
    self.enabled = false;
    self.present_loaded(index, renderer);
  }

  fn present_loaded<R: NodeRenderer>(&self, index: &mut OctreeIndex<R::Handle>, renderer: &mut R) {
    let OctreeIndex { nodes, loaded, .. } = index;
    for id in loaded.iter() {
      if let Some(node) = nodes.get_mut(id) {
        self.present(node, renderer);
      }
    }
  }

  /// Set `enabled` without touching any payload (no dataset loaded yet).
  pub(crate) fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
  }
}
