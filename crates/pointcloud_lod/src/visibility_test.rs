use glam::{DVec3, UVec2};

use super::*;
use crate::config::MIN_VISIBLE_NODE_SIZE_PX;
use crate::octree::{build, CandidateTable, DAabb3};

fn table(entries: &[(u64, u64)]) -> CandidateTable {
  entries
    .iter()
    .map(|&(id, points)| (NodeId::new(id), points))
    .collect()
}

fn scenario_index(entries: &[(u64, u64)]) -> OctreeIndex<()> {
  build(DAabb3::new(DVec3::ZERO, DVec3::ONE), 2, &table(entries)).unwrap()
}

fn camera(position: DVec3, target: DVec3, far: f64) -> CameraState {
  CameraState::look_at(
    position,
    target,
    60f64.to_radians(),
    UVec2::new(800, 600),
    0.1,
    far,
  )
}

fn near_camera() -> CameraState {
  camera(DVec3::new(0.5, 0.5, 2.0), DVec3::splat(0.5), 100.0)
}

fn distant_camera() -> CameraState {
  camera(DVec3::new(0.5, 0.5, 10.5), DVec3::splat(0.5), 1000.0)
}

fn ids(set: &VisibleSet) -> Vec<u64> {
  let mut ids: Vec<u64> = set.ids.iter().map(|id| id.raw()).collect();
  ids.sort();
  ids
}

const SCENARIO: &[(u64, u64)] = &[(1, 1000), (11, 200), (12, 200)];

// =========================================================================
// Screen radius
// =========================================================================

#[test]
fn test_screen_radius_formula() {
  let cam = CameraState::look_at(
    DVec3::ZERO,
    DVec3::new(0.0, 0.0, -1.0),
    90f64.to_radians(),
    UVec2::new(800, 600),
    0.1,
    100.0,
  );
  // r * (h / 2) / (tan(fov / 2) * d) = 1 * 300 / (1 * 10)
  let px = screen_radius(1.0, DVec3::new(0.0, 0.0, -10.0), &cam);
  assert_eq!(px, 30.0);
}

#[test]
fn test_screen_radius_at_center_is_infinite() {
  let cam = near_camera();
  assert_eq!(screen_radius(0.1, cam.position, &cam), f64::INFINITY);
}

// =========================================================================
// Classification
// =========================================================================

#[test]
fn test_root_visible_when_camera_looks_away() {
  let mut index = scenario_index(SCENARIO);
  let away = camera(DVec3::new(0.5, 0.5, 2.0), DVec3::new(0.5, 0.5, 5.0), 100.0);
  let set = update_visibility(&mut index, &away, &LodConfig::default());
  assert_eq!(ids(&set), vec![1]);
  assert_eq!(set.point_count, 1000);
}

#[test]
fn test_near_camera_sees_all_children() {
  let mut index = scenario_index(SCENARIO);
  let config = LodConfig {
    lod_cutoff_depth: 1,
    ..Default::default()
  };
  let set = update_visibility(&mut index, &near_camera(), &config);
  assert_eq!(ids(&set), vec![1, 11, 12]);
  assert_eq!(set.point_count, 1400);
}

/// A distant camera shrinks node 11 below the pixel threshold.
#[test]
fn test_small_node_culled_root_kept() {
  let mut index = scenario_index(SCENARIO);
  let config = LodConfig {
    lod_cutoff_depth: 1,
    ..Default::default()
  };
  let cam = distant_camera();
  let sphere = index.get(NodeId::new(11)).unwrap().bounding_sphere;
  assert!(screen_radius(sphere.radius, sphere.center, &cam) <= MIN_VISIBLE_NODE_SIZE_PX);

  let set = update_visibility(&mut index, &cam, &config);
  assert!(set.contains(NodeId::ROOT));
  assert!(!set.contains(NodeId::new(11)));
}

/// Nodes shallower than the cutoff skip the size test.
#[test]
fn test_shallow_nodes_exempt_from_size_test() {
  let mut index = scenario_index(SCENARIO);
  let set = update_visibility(&mut index, &distant_camera(), &LodConfig::default());
  assert_eq!(ids(&set), vec![1, 11, 12]);
}

#[test]
fn test_far_plane_excludes_children() {
  let mut index = scenario_index(SCENARIO);
  // Children sit at z <= 0.5, i.e. 10 units away; the root box starts at 9.5.
  let cam = camera(DVec3::new(0.5, 0.5, 10.5), DVec3::splat(0.5), 9.8);
  let set = update_visibility(&mut index, &cam, &LodConfig::default());
  assert_eq!(ids(&set), vec![1]);
}

#[test]
fn test_point_budget_skips_nodes_that_would_overflow() {
  let mut index = scenario_index(&[(1, 1000), (11, 200), (12, 50)]);
  let config = LodConfig {
    point_budget: Some(1100),
    ..Default::default()
  };
  let set = update_visibility(&mut index, &near_camera(), &config);
  assert_eq!(ids(&set), vec![1, 12]);
  assert_eq!(set.point_count, 1050);
}

/// Frustum-rejected parents imply frustum-rejected children, so pruning
/// never changes the result.
#[test]
fn test_pruning_keeps_same_visible_set() {
  let entries: Vec<(u64, u64)> = [1u64, 11, 12, 15, 18, 111, 118, 121, 155, 181, 188]
    .iter()
    .map(|&id| (id, 10))
    .collect();
  let cameras = [
    near_camera(),
    distant_camera(),
    camera(DVec3::new(-0.5, 0.2, 0.2), DVec3::new(0.1, 0.2, 0.2), 100.0),
    camera(DVec3::new(0.9, 0.9, 0.9), DVec3::new(2.0, 2.0, 2.0), 100.0),
  ];
  let pruned = LodConfig {
    prune_invisible_subtrees: true,
    lod_cutoff_depth: 1,
    ..Default::default()
  };
  let full = LodConfig {
    prune_invisible_subtrees: false,
    ..pruned.clone()
  };

  for cam in &cameras {
    let mut a = scenario_index(&entries);
    let mut b = scenario_index(&entries);
    assert_eq!(
      update_visibility(&mut a, cam, &pruned),
      update_visibility(&mut b, cam, &full)
    );
  }
}

// =========================================================================
// Visible flags
// =========================================================================

#[test]
fn test_flags_track_latest_pass() {
  let mut index = scenario_index(SCENARIO);
  let config = LodConfig::default();

  let first = update_visibility(&mut index, &near_camera(), &config);
  assert!(index.get(NodeId::new(11)).unwrap().visible);
  index.visible = first.ids;

  let cam = camera(DVec3::new(0.5, 0.5, 10.5), DVec3::splat(0.5), 9.8);
  update_visibility(&mut index, &cam, &config);
  assert!(index.root().visible);
  assert!(!index.get(NodeId::new(11)).unwrap().visible);
  assert!(!index.get(NodeId::new(12)).unwrap().visible);
}

#[test]
fn test_pruned_nodes_lose_stale_flags() {
  let mut index = scenario_index(SCENARIO);
  let config = LodConfig {
    prune_invisible_subtrees: true,
    ..Default::default()
  };

  let first = update_visibility(&mut index, &near_camera(), &config);
  assert!(index.get(NodeId::new(12)).unwrap().visible);
  index.visible = first.ids;

  let away = camera(DVec3::new(0.5, 0.5, 2.0), DVec3::new(0.5, 0.5, 5.0), 100.0);
  update_visibility(&mut index, &away, &config);
  assert!(!index.get(NodeId::new(11)).unwrap().visible);
  assert!(!index.get(NodeId::new(12)).unwrap().visible);
}
