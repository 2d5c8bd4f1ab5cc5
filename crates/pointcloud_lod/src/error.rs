//! Error type for the streaming engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::octree::NodeId;

/// Errors surfaced by index construction, configuration and engine calls.
///
/// A loader returning no payload is not an error: the node silently reverts
/// to unloaded and is retried on a later visibility pass.
#[derive(Debug, Error)]
pub enum LodError {
  /// A candidate table entry cannot be derived from its parent.
  #[error("node {id} breaks the octree structure: {reason}")]
  StructuralIntegrity { id: NodeId, reason: &'static str },

  /// A configuration value is out of range.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// A caller violated an API precondition.
  #[error("precondition violated: {0}")]
  Precondition(&'static str),

  /// An operation that needs a dataset was called before one was loaded.
  #[error("no dataset loaded; build the octree index first")]
  IndexNotBuilt,

  /// The load pool could not be created (e.g. no thread support).
  #[error("failed to build load thread pool")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),

  /// The id is not part of the current index.
  #[error("node {0} is not in the octree index")]
  UnknownNode(NodeId),

  #[error("failed to read config file {path}")]
  ConfigIo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config TOML")]
  ConfigParse(#[from] toml::de::Error),
}
