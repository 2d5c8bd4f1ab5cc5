//! Seams to the host application: where node data comes from and where it
//! goes once loaded.

use crate::octree::NodeId;

/// Fetches and decodes the points of one node.
///
/// Called on load-pool threads (or inline on the owning thread with
/// [`LoadExecution::Inline`]). Returning `None` means "no data"; the node
/// reverts to unloaded and is requested again on a later visibility pass.
/// The engine never retries on its own.
///
/// [`LoadExecution::Inline`]: crate::config::LoadExecution::Inline
pub trait NodeLoader: Send + Sync + 'static {
  type Data: Send + 'static;

  fn load_node(&self, id: NodeId) -> Option<Self::Data>;
}

/// Turns loaded data into displayable objects.
///
/// Only ever called from the thread that owns the engine.
pub trait NodeRenderer {
  type Data;
  /// Handle stored as the node payload until disposed.
  type Handle;

  /// Create a displayable object for a freshly loaded node.
  fn create(&mut self, id: NodeId, data: Self::Data) -> Self::Handle;

  fn set_visible(&mut self, handle: &mut Self::Handle, visible: bool);

  /// Release everything held by the handle.
  fn dispose(&mut self, handle: Self::Handle);
}
