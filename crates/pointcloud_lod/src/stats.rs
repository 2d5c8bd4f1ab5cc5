//! Engine statistics for overlays and logging.
//!
//! # Usage
//!
//! ```ignore
//! let stats = engine.stats();
//! println!(
//!     "{} visible / {} loaded / {} queued, avg load {:.1} ms",
//!     stats.visible_nodes,
//!     stats.loaded_nodes,
//!     stats.queued,
//!     stats.avg_load_us / 1000.0,
//! );
//! ```

use std::collections::VecDeque;

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.capacity == 0 {
      return;
    }
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Snapshot of engine state, taken with `LodEngine::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStats {
  /// Nodes in the index (0 without a dataset).
  pub total_nodes: usize,
  /// Nodes accepted by the last visibility pass.
  pub visible_nodes: usize,
  /// Summed point count of the visible nodes.
  pub visible_points: u64,
  pub loading_nodes: usize,
  pub loaded_nodes: usize,
  /// Nodes waiting in the load queue.
  pub queued: usize,
  /// Loads dispatched but not yet drained, stale ones included.
  pub in_flight: usize,
  /// Completions dropped because the cache was invalidated under them.
  pub stale_discarded: u64,
  /// Loads that returned no data.
  pub failed_loads: u64,
  pub completed_loads: u64,
  /// Average loader time over the recent window, in microseconds.
  pub avg_load_us: f64,
  /// Fastest and slowest loader time in the same window.
  pub min_load_us: u64,
  pub max_load_us: u64,
  /// Duration of the last visibility pass, in microseconds.
  pub last_visibility_us: u64,
}

impl EngineStats {
  /// Fraction of nodes with a payload.
  pub fn loaded_ratio(&self) -> f64 {
    if self.total_nodes == 0 {
      0.0
    } else {
      self.loaded_nodes as f64 / self.total_nodes as f64
    }
  }
}
