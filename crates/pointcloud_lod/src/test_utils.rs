//! Test utilities: candidate tables, cameras, mock loaders and a recording
//! renderer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{self as channel, Receiver, Sender};
use glam::{DVec3, UVec2};
use web_time::{Duration, Instant};

use crate::camera::CameraState;
use crate::host::{NodeLoader, NodeRenderer};
use crate::octree::{CandidateTable, DAabb3, NodeId};

// =============================================================================
// Fixtures
// =============================================================================

pub fn table(entries: &[(u64, u64)]) -> CandidateTable {
  entries
    .iter()
    .map(|&(id, points)| (NodeId::new(id), points))
    .collect()
}

pub fn ids(raw: &[u64]) -> Vec<NodeId> {
  raw.iter().copied().map(NodeId::new).collect()
}

pub fn sorted(ids: impl IntoIterator<Item = NodeId>) -> Vec<u64> {
  let mut raw: Vec<u64> = ids.into_iter().map(NodeId::raw).collect();
  raw.sort();
  raw
}

pub fn unit_cube() -> DAabb3 {
  DAabb3::new(DVec3::ZERO, DVec3::ONE)
}

/// Camera 1.5 units in front of the unit cube; every child of the root is
/// in view and large on screen.
pub fn near_camera() -> CameraState {
  CameraState::look_at(
    DVec3::new(0.5, 0.5, 2.0),
    DVec3::splat(0.5),
    60f64.to_radians(),
    UVec2::new(800, 600),
    0.1,
    100.0,
  )
}

/// Same position as [`near_camera`], facing away from the cube.
pub fn away_camera() -> CameraState {
  CameraState::look_at(
    DVec3::new(0.5, 0.5, 2.0),
    DVec3::new(0.5, 0.5, 5.0),
    60f64.to_radians(),
    UVec2::new(800, 600),
    0.1,
    100.0,
  )
}

/// Run `step` every millisecond until it returns true or a second passes.
pub fn wait_until(mut step: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + Duration::from_secs(1);
  while Instant::now() < deadline {
    if step() {
      return true;
    }
    std::thread::sleep(std::time::Duration::from_millis(1));
  }
  false
}

// =============================================================================
// Loaders
// =============================================================================

/// Returns the node's raw id as data, except for ids listed as failing.
#[derive(Default)]
pub struct MockLoader {
  pub failing: HashSet<NodeId>,
  calls: Mutex<Vec<NodeId>>,
}

impl MockLoader {
  pub fn failing(raw: &[u64]) -> Self {
    Self {
      failing: ids(raw).into_iter().collect(),
      ..Default::default()
    }
  }

  /// Ids in the order the loader was called.
  pub fn calls(&self) -> Vec<NodeId> {
    self.calls.lock().unwrap().clone()
  }
}

impl NodeLoader for MockLoader {
  type Data = u64;

  fn load_node(&self, id: NodeId) -> Option<u64> {
    self.calls.lock().unwrap().push(id);
    (!self.failing.contains(&id)).then_some(id.raw())
  }
}

/// Blocks each load until the test opens that node's gate.
pub struct GatedLoader {
  gates: HashMap<NodeId, (Sender<()>, Receiver<()>)>,
  running: AtomicUsize,
  peak: AtomicUsize,
}

impl GatedLoader {
  pub fn new(raw: &[u64]) -> Self {
    Self {
      gates: ids(raw).into_iter().map(|id| (id, channel::bounded(1))).collect(),
      running: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
    }
  }

  pub fn open(&self, raw: u64) {
    if let Some((tx, _)) = self.gates.get(&NodeId::new(raw)) {
      let _ = tx.try_send(());
    }
  }

  /// Highest number of loader calls observed running at once.
  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }
}

impl NodeLoader for GatedLoader {
  type Data = u64;

  fn load_node(&self, id: NodeId) -> Option<u64> {
    let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(running, Ordering::SeqCst);
    let opened = self
      .gates
      .get(&id)
      .is_some_and(|(_, rx)| rx.recv_timeout(std::time::Duration::from_secs(5)).is_ok());
    self.running.fetch_sub(1, Ordering::SeqCst);
    opened.then_some(id.raw())
  }
}

// =============================================================================
// Renderer
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
pub struct MockHandle {
  pub id: NodeId,
  pub data: u64,
}

/// Records created, shown and disposed nodes.
#[derive(Default)]
pub struct RecordingRenderer {
  pub created: Vec<NodeId>,
  pub disposed: Vec<NodeId>,
  /// Current display state per live handle.
  pub shown: HashMap<NodeId, bool>,
}

impl RecordingRenderer {
  pub fn live(&self) -> usize {
    self.shown.len()
  }

  pub fn is_shown(&self, raw: u64) -> bool {
    self.shown.get(&NodeId::new(raw)).copied().unwrap_or(false)
  }
}

impl NodeRenderer for RecordingRenderer {
  type Data = u64;
  type Handle = MockHandle;

  fn create(&mut self, id: NodeId, data: u64) -> MockHandle {
    self.created.push(id);
    self.shown.insert(id, false);
    MockHandle { id, data }
  }

  fn set_visible(&mut self, handle: &mut MockHandle, visible: bool) {
    self.shown.insert(handle.id, visible);
  }

  fn dispose(&mut self, handle: MockHandle) {
    self.disposed.push(handle.id);
    self.shown.remove(&handle.id);
  }
}
