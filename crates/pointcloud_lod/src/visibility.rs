//! Visibility classification: frustum test plus screen-space size LOD.
//!
//! # Per-node test
//!
//! 1. The root is always visible.
//! 2. Nodes whose box misses the view frustum are rejected.
//! 3. Nodes at depth >= `lod_cutoff_depth` are rejected when their bounding
//!    sphere projects to `min_visible_node_size_px` pixels or fewer.
//!
//! The walk is breadth-first over the whole tree by default. An invisible
//! parent does not hide its children unless `prune_invisible_subtrees` is
//! set, in which case children of frustum-rejected nodes are never visited.

use std::collections::{HashSet, VecDeque};

use glam::DVec3;
use tracing::trace;

use crate::camera::CameraState;
use crate::config::LodConfig;
use crate::octree::{NodeId, OctreeIndex};

/// Output of one visibility pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibleSet {
  pub ids: HashSet<NodeId>,
  /// Summed point count of accepted nodes.
  pub point_count: u64,
}

impl VisibleSet {
  pub fn contains(&self, id: NodeId) -> bool {
    self.ids.contains(&id)
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Classification {
  Visible,
  OutsideFrustum,
  TooSmall,
  OverBudget,
}

/// Projected bounding-sphere radius in pixels, rounded to the nearest pixel.
///
/// Returns infinity when the camera sits on the sphere center.
pub fn screen_radius(sphere_radius: f64, center: DVec3, camera: &CameraState) -> f64 {
  let distance = camera.position.distance(center);
  let slope = (camera.fov_y * 0.5).tan();
  if distance <= f64::EPSILON || slope <= 0.0 {
    return f64::INFINITY;
  }
  let half_height = 0.5 * camera.viewport.y as f64;
  (sphere_radius * half_height / (slope * distance)).round()
}

/// Classify every node for the given camera and record `visible` flags.
///
/// The returned set is the new visible set; the index's previous visible set
/// is left untouched so the caller can diff the two.
#[tracing::instrument(skip_all, name = "visibility::update")]
pub fn update_visibility<P>(
  index: &mut OctreeIndex<P>,
  camera: &CameraState,
  config: &LodConfig,
) -> VisibleSet {
  let frustum = camera.frustum();
  let mut out = VisibleSet::default();

  let mut frontier = VecDeque::from([NodeId::ROOT]);
  let mut visited = HashSet::new();
  while let Some(id) = frontier.pop_front() {
    let Some(node) = index.nodes.get_mut(&id) else {
      continue;
    };
    visited.insert(id);

    let class = if id.is_root() {
      Classification::Visible
    } else if !frustum.intersects_aabb(&node.bounding_box) {
      Classification::OutsideFrustum
    } else if node.depth() >= config.lod_cutoff_depth
      && screen_radius(node.bounding_sphere.radius, node.bounding_sphere.center, camera)
        <= config.min_visible_node_size_px
    {
      Classification::TooSmall
    } else if config
      .point_budget
      .is_some_and(|budget| out.point_count + node.point_count > budget)
    {
      Classification::OverBudget
    } else {
      Classification::Visible
    };

    node.visible = class == Classification::Visible;
    if node.visible {
      out.ids.insert(id);
      out.point_count += node.point_count;
    }

    let prune = config.prune_invisible_subtrees && class == Classification::OutsideFrustum;
    if !prune {
      frontier.extend(node.children.iter().copied());
    }
  }

  // Pruned subtrees were not visited; clear their stale flags.
  for id in &index.visible {
    if visited.contains(id) {
      continue;
    }
    if let Some(node) = index.nodes.get_mut(id) {
      node.visible = false;
    }
  }

  trace!(
    visited = visited.len(),
    visible = out.ids.len(),
    points = out.point_count,
    "visibility pass"
  );
  out
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;
