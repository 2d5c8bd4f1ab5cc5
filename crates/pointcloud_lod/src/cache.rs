//! Per-node load-state tracking.
//!
//! Transitions are the only writers of `OctreeNode::load_state`, the node's
//! payload and the index's `loading` / `loaded` sets, so the three always
//! agree:
//!
//! ```text
//! Unloaded --mark_loading--> Loading --mark_loaded--> Loaded
//!    ^                          |                        |
//!    +-------mark_failed--------+                        |
//!    +------------------invalidate_all-------------------+
//! ```

use tracing::debug;

use crate::octree::{LoadState, NodeId, OctreeIndex};

impl<P> OctreeIndex<P> {
  pub fn is_loaded(&self, id: NodeId) -> bool {
    self.loaded.contains(&id)
  }

  pub fn is_loading(&self, id: NodeId) -> bool {
    self.loading.contains(&id)
  }

  /// Unloaded -> Loading. Returns false (and changes nothing) when the node
  /// is unknown or already loading/loaded.
  pub fn mark_loading(&mut self, id: NodeId) -> bool {
    let Some(node) = self.nodes.get_mut(&id) else {
      return false;
    };
    if node.load_state != LoadState::Unloaded {
      return false;
    }
    node.load_state = LoadState::Loading;
    self.loading.insert(id);
    true
  }

  /// Loading -> Loaded, attaching the payload.
  ///
  /// A node that is no longer loading (invalidated or unloaded meanwhile)
  /// hands the payload back so the caller can dispose of it.
  pub fn mark_loaded(&mut self, id: NodeId, payload: P) -> Result<(), P> {
    let Some(node) = self.nodes.get_mut(&id) else {
      return Err(payload);
    };
    if node.load_state != LoadState::Loading {
      return Err(payload);
    }
    node.load_state = LoadState::Loaded;
    node.payload = Some(payload);
    self.loading.remove(&id);
    self.loaded.insert(id);
    Ok(())
  }

  /// Loading -> Unloaded. The node is neither loading nor loaded afterwards,
  /// so the next visibility pass queues it again.
  pub fn mark_failed(&mut self, id: NodeId) -> bool {
    let Some(node) = self.nodes.get_mut(&id) else {
      return false;
    };
    if node.load_state != LoadState::Loading {
      return false;
    }
    node.load_state = LoadState::Unloaded;
    self.loading.remove(&id);
    debug!(node = %id, "load returned no data, node reverted to unloaded");
    true
  }

  /// Reset every loading or loaded node to unloaded and take their payloads.
  pub fn invalidate_all(&mut self) -> Vec<(NodeId, P)> {
    let mut payloads = Vec::with_capacity(self.loaded.len());
    for id in self.loaded.drain().chain(self.loading.drain()) {
      let Some(node) = self.nodes.get_mut(&id) else {
        continue;
      };
      node.load_state = LoadState::Unloaded;
      if let Some(payload) = node.payload.take() {
        payloads.push((id, payload));
      }
    }
    debug!(disposed = payloads.len(), "invalidated node cache");
    payloads
  }
}
