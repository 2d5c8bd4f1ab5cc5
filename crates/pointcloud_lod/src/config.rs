//! Engine configuration: LOD thresholds and load-scheduling budget.
//!
//! Every field has a default, so a TOML file only needs the values it
//! overrides:
//!
//! ```toml
//! max_parallel_loads = 4
//! min_visible_node_size_px = 60.0
//! point_budget = 3_000_000
//! ```

use std::path::Path;

use serde::Deserialize;
use web_time::Duration;

use crate::error::LodError;
use crate::octree::MAX_SUPPORTED_DEPTH;

/// Screen radius (pixels) at or below which a node is culled.
pub const MIN_VISIBLE_NODE_SIZE_PX: f64 = 40.0;

/// How loads are executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadExecution {
  /// Dedicated rayon pool with one thread per load slot.
  #[default]
  Pool,
  /// Loader runs on the caller's thread inside `tick()` (hosts without
  /// threads, e.g. wasm32 without atomics).
  Inline,
}

/// Configuration for visibility classification and load scheduling.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LodConfig {
  /// Deepest level instantiated by the index builder.
  pub max_depth: u32,
  /// Maximum loads in flight at once (must be > 0).
  pub max_parallel_loads: usize,
  /// Maximum loads started per pump tick (0 = unlimited).
  pub max_starts_per_tick: usize,
  /// Minimum time between pump ticks, in milliseconds.
  pub tick_interval_ms: u64,
  /// Nodes whose projected radius is at or below this are culled.
  pub min_visible_node_size_px: f64,
  /// Nodes shallower than this depth skip the screen-size test.
  pub lod_cutoff_depth: u32,
  /// Optional cap on the summed point count of visible nodes.
  pub point_budget: Option<u64>,
  /// Skip children of nodes outside the frustum.
  pub prune_invisible_subtrees: bool,
  pub execution: LoadExecution,
}

impl LodConfig {
  /// Defaults matching the reference viewer behaviour.
  pub const DEFAULT: Self = Self {
    max_depth: MAX_SUPPORTED_DEPTH,
    max_parallel_loads: 2,
    max_starts_per_tick: 1,
    tick_interval_ms: 20,
    min_visible_node_size_px: MIN_VISIBLE_NODE_SIZE_PX,
    lod_cutoff_depth: 2,
    point_budget: None,
    prune_invisible_subtrees: false,
    execution: LoadExecution::Pool,
  };

  /// Synchronous loading and unlimited per-tick starts. Used by tests and
  /// single-threaded hosts.
  pub const INLINE: Self = Self {
    max_starts_per_tick: 0,
    execution: LoadExecution::Inline,
    ..Self::DEFAULT
  };

  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, LodError> {
    let content = std::fs::read_to_string(path).map_err(|source| LodError::ConfigIo {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse and validate configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, LodError> {
    let config: LodConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), LodError> {
    if self.max_parallel_loads == 0 {
      return Err(LodError::InvalidConfig(
        "max_parallel_loads must be at least 1".into(),
      ));
    }
    if self.max_depth > MAX_SUPPORTED_DEPTH {
      return Err(LodError::InvalidConfig(format!(
        "max_depth must be <= {}, got {}",
        MAX_SUPPORTED_DEPTH, self.max_depth
      )));
    }
    if self.min_visible_node_size_px.is_nan() || self.min_visible_node_size_px < 0.0 {
      return Err(LodError::InvalidConfig(format!(
        "min_visible_node_size_px must be >= 0, got {}",
        self.min_visible_node_size_px
      )));
    }
    Ok(())
  }

  #[inline]
  pub fn tick_interval(&self) -> Duration {
    Duration::from_millis(self.tick_interval_ms)
  }
}

impl Default for LodConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}
