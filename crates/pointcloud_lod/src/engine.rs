//! LodEngine - one streamed point-cloud dataset and everything that drives it.
//!
//! The engine is owned by a single thread (usually the host's frame loop).
//! Only loader calls leave that thread; their results come back through the
//! scheduler and are applied during `update()` / `tick()`.
//!
//! # Frame Loop
//!
//! ```ignore
//! let mut engine = LodEngine::new(loader, renderer, LodConfig::default())?;
//! engine.load_dataset(root_box, &candidates)?;
//!
//! loop {
//!     engine.update_camera(&camera)?;
//!     engine.update();
//!     for event in engine.drain_events() {
//!         // toggle a loading indicator
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use web_time::Instant;

use crate::camera::CameraState;
use crate::config::LodConfig;
use crate::error::LodError;
use crate::host::{NodeLoader, NodeRenderer};
use crate::octree::{build, CandidateTable, DAabb3, NodeId, OctreeIndex};
use crate::render_state::RenderStateController;
use crate::scheduler::{LoadEvent, LoadScheduler};
use crate::stats::EngineStats;
use crate::visibility::update_visibility;

/// Streaming context for one dataset.
///
/// `R::Handle` is stored as the node payload; every handle the renderer
/// creates is eventually passed back to `R::dispose`.
pub struct LodEngine<L: NodeLoader, R: NodeRenderer<Data = L::Data>> {
  config: LodConfig,
  index: Option<OctreeIndex<R::Handle>>,
  scheduler: LoadScheduler<L>,
  render: RenderStateController,
  loader: Arc<L>,
  renderer: R,
  visible_points: u64,
  last_visibility_us: u64,
}

impl<L: NodeLoader, R: NodeRenderer<Data = L::Data>> LodEngine<L, R> {
  pub fn new(loader: L, renderer: R, config: LodConfig) -> Result<Self, LodError> {
    config.validate()?;
    let loader = Arc::new(loader);
    let scheduler = LoadScheduler::new(Arc::clone(&loader), &config)?;
    Ok(Self {
      config,
      index: None,
      scheduler,
      render: RenderStateController::new(),
      loader,
      renderer,
      visible_points: 0,
      last_visibility_us: 0,
    })
  }

  // -------------------------------------------------------------------------
  // Dataset lifecycle
  // -------------------------------------------------------------------------

  /// Build the index for a new dataset, replacing (and disposing) any
  /// previous one. A table that fails validation leaves the current dataset
  /// untouched.
  pub fn load_dataset(&mut self, root_box: DAabb3, table: &CandidateTable) -> Result<(), LodError> {
    let index = build(root_box, self.config.max_depth, table)?;
    self.unload_dataset();
    info!(nodes = index.len(), "dataset loaded");
    self.index = Some(index);
    Ok(())
  }

  /// Drop the dataset, disposing every payload.
  pub fn unload_dataset(&mut self) {
    self.scheduler.clear();
    self.visible_points = 0;
    let Some(mut index) = self.index.take() else {
      return;
    };
    let payloads = index.invalidate_all();
    let disposed = payloads.len();
    for (_, handle) in payloads {
      self.renderer.dispose(handle);
    }
    info!(disposed, "dataset unloaded");
  }

  pub fn has_dataset(&self) -> bool {
    self.index.is_some()
  }

  // -------------------------------------------------------------------------
  // Per-frame
  // -------------------------------------------------------------------------

  /// Classify nodes for `camera`, update display state and queue newly
  /// visible nodes. Returns the number of nodes queued by this call.
  pub fn update_camera(&mut self, camera: &CameraState) -> Result<usize, LodError> {
    let index = self.index.as_mut().ok_or(LodError::IndexNotBuilt)?;

    let start = Instant::now();
    let visible = update_visibility(index, camera, &self.config);
    self.last_visibility_us = start.elapsed().as_micros() as u64;

    let previous = std::mem::take(&mut index.visible);
    self.render
      .apply_visibility_delta(index, &mut self.renderer, &previous, &visible.ids);
    index.visible = visible.ids;
    self.visible_points = visible.point_count;

    Ok(self.scheduler.reconcile(index, index.visible.iter().copied()))
  }

  /// Run a scheduler tick if one is due. Call once per frame.
  pub fn update(&mut self) -> bool {
    self.update_at(Instant::now())
  }

  pub fn update_at(&mut self, now: Instant) -> bool {
    let Some(index) = self.index.as_mut() else {
      return self.scheduler.update_detached(now);
    };
    let render = self.render;
    let renderer = &mut self.renderer;
    self.scheduler.update(now, index, |index, id, data| {
      attach(index, renderer, &render, id, data)
    })
  }

  /// Tick immediately, ignoring pacing. Returns the number of loads started.
  pub fn tick(&mut self) -> usize {
    let Some(index) = self.index.as_mut() else {
      self.scheduler.tick_detached(Instant::now());
      return 0;
    };
    let render = self.render;
    let renderer = &mut self.renderer;
    self.scheduler.tick(index, |index, id, data| {
      attach(index, renderer, &render, id, data)
    })
  }

  // -------------------------------------------------------------------------
  // Loading
  // -------------------------------------------------------------------------

  /// Request a load outside the visibility-driven queue.
  ///
  /// Returns true when the load started now; false when the node is
  /// already loaded/loading or was queued for a free slot.
  pub fn load_node(&mut self, id: NodeId) -> Result<bool, LodError> {
    let index = self.index.as_mut().ok_or(LodError::IndexNotBuilt)?;
    if !index.contains(id) {
      return Err(LodError::UnknownNode(id));
    }
    Ok(self.scheduler.load_node(index, id))
  }

  /// Dispose every payload and reload what is currently visible.
  pub fn invalidate_all(&mut self) {
    let Some(index) = self.index.as_mut() else {
      return;
    };
    let payloads = index.invalidate_all();
    debug!(disposed = payloads.len(), "invalidating node cache");
    for (_, handle) in payloads {
      self.renderer.dispose(handle);
    }
    self.scheduler.invalidate(index.visible.iter().copied());
  }

  pub fn set_max_parallel_loads(&mut self, max: usize) -> Result<(), LodError> {
    self.scheduler.set_max_parallel_loads(max)?;
    self.config.max_parallel_loads = max;
    Ok(())
  }

  // -------------------------------------------------------------------------
  // Display
  // -------------------------------------------------------------------------

  pub fn all_show(&mut self) {
    match self.index.as_mut() {
      Some(index) => self.render.all_show(index, &mut self.renderer),
      None => self.render.set_enabled(true),
    }
  }

  pub fn all_hide(&mut self) {
    match self.index.as_mut() {
      Some(index) => self.render.all_hide(index, &mut self.renderer),
      None => self.render.set_enabled(false),
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.render.is_enabled()
  }

  // -------------------------------------------------------------------------
  // Inspection
  // -------------------------------------------------------------------------

  pub fn drain_events(&mut self) -> Vec<LoadEvent> {
    self.scheduler.drain_events()
  }

  /// True when no load is queued or in flight.
  pub fn is_idle(&self) -> bool {
    self.scheduler.is_idle()
  }

  pub fn index(&self) -> Option<&OctreeIndex<R::Handle>> {
    self.index.as_ref()
  }

  /// Visible set of the last camera update.
  pub fn visible_ids(&self) -> Option<&HashSet<NodeId>> {
    self.index.as_ref().map(OctreeIndex::visible_ids)
  }

  pub fn config(&self) -> &LodConfig {
    &self.config
  }

  pub fn loader(&self) -> &L {
    &self.loader
  }

  pub fn renderer(&self) -> &R {
    &self.renderer
  }

  pub fn renderer_mut(&mut self) -> &mut R {
    &mut self.renderer
  }

  pub fn stats(&self) -> EngineStats {
    let timings = self.scheduler.load_timings();
    let (min_load_us, max_load_us) = timings.min_max().unwrap_or_default();
    let mut stats = EngineStats {
      queued: self.scheduler.queue_len(),
      in_flight: self.scheduler.in_flight(),
      stale_discarded: self.scheduler.stale_discarded(),
      failed_loads: self.scheduler.failed_loads(),
      completed_loads: self.scheduler.completed_loads(),
      avg_load_us: timings.average(),
      min_load_us,
      max_load_us,
      last_visibility_us: self.last_visibility_us,
      ..Default::default()
    };
    if let Some(index) = &self.index {
      stats.total_nodes = index.len();
      stats.visible_nodes = index.visible_ids().len();
      stats.visible_points = self.visible_points;
      stats.loading_nodes = index.loading_ids().len();
      stats.loaded_nodes = index.loaded_ids().len();
    }
    stats
  }
}

impl<L: NodeLoader, R: NodeRenderer<Data = L::Data>> Drop for LodEngine<L, R> {
  fn drop(&mut self) {
    self.unload_dataset();
  }
}

/// Turn loader output into a payload and show it if it should be visible.
fn attach<R: NodeRenderer>(
  index: &mut OctreeIndex<R::Handle>,
  renderer: &mut R,
  render: &RenderStateController,
  id: NodeId,
  data: R::Data,
) {
  let handle = renderer.create(id, data);
  match index.mark_loaded(id, handle) {
    Ok(()) => {
      if let Some(node) = index.get_mut(id) {
        render.present(node, renderer);
      }
    }
    Err(handle) => renderer.dispose(handle),
  }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
