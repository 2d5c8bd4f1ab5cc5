//! Spatial index construction from a candidate table.
//!
//! The candidate table is the only source of truth for which nodes exist:
//! geometry decides each child's box, the table decides whether the child is
//! instantiated at all. Construction happens exactly once per dataset.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use super::bounds::DAabb3;
use super::node::OctreeNode;
use super::node_id::MAX_SUPPORTED_DEPTH;
use super::{NodeId, OctreeIndex};
use crate::error::LodError;

/// Existing node ids mapped to their point counts.
pub type CandidateTable = HashMap<NodeId, u64>;

/// Build an octree index breadth-first from the root box.
///
/// A subtree stops expanding once its depth reaches `max_depth`. Table
/// entries deeper than `max_depth` are ignored. Entries that cannot be
/// reached from the root (malformed digits or a missing parent) fail the
/// build with [`LodError::StructuralIntegrity`].
///
/// An empty table yields an index containing only the root.
#[tracing::instrument(skip_all, name = "octree::build", fields(candidates = table.len()))]
pub fn build<P>(
  root_box: DAabb3,
  max_depth: u32,
  table: &CandidateTable,
) -> Result<OctreeIndex<P>, LodError> {
  if max_depth > MAX_SUPPORTED_DEPTH {
    return Err(LodError::InvalidConfig(format!(
      "max_depth {} exceeds the supported maximum of {}",
      max_depth, MAX_SUPPORTED_DEPTH
    )));
  }

  validate_table(max_depth, table)?;

  let root_points = table.get(&NodeId::ROOT).copied().unwrap_or(0);
  let mut index = OctreeIndex::with_root(root_box, max_depth, root_points);

  if table.is_empty() {
    info!("empty candidate table, index holds only the root");
    return Ok(index);
  }

  let mut frontier = VecDeque::from([NodeId::ROOT]);
  while let Some(id) = frontier.pop_front() {
    if id.depth() >= max_depth {
      continue;
    }

    let parent_box = index.nodes[&id].bounding_box;
    for octant in 0..8u8 {
      let Some(child) = id.child(octant) else {
        continue;
      };
      let Some(&points) = table.get(&child) else {
        continue;
      };

      index
        .nodes
        .insert(child, OctreeNode::new(child, parent_box.octant(octant), points));
      if let Some(parent) = index.nodes.get_mut(&id) {
        parent.children.push(child);
      }
      frontier.push_back(child);
    }
  }

  info!(nodes = index.len(), max_depth, "built octree index");
  Ok(index)
}

fn validate_table(max_depth: u32, table: &CandidateTable) -> Result<(), LodError> {
  let mut skipped = 0usize;
  for &id in table.keys() {
    id.validate()
      .map_err(|reason| LodError::StructuralIntegrity { id, reason })?;

    if id.depth() > max_depth {
      skipped += 1;
      continue;
    }

    if let Some(parent) = id.parent() {
      if !parent.is_root() && !table.contains_key(&parent) {
        return Err(LodError::StructuralIntegrity {
          id,
          reason: "parent id missing from candidate table",
        });
      }
    }
  }

  if skipped > 0 {
    debug!(skipped, max_depth, "ignored candidates deeper than max_depth");
  }
  Ok(())
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
