//! Stand-in loader and renderer for replays without real point data.
//!
//! The loader sleeps for the configured latency and returns the node's point
//! count from the candidate table; the renderer only keeps counters.

use std::collections::HashMap;
use std::time::Duration;

use pointcloud_lod::{CandidateTable, NodeId, NodeLoader, NodeRenderer};

/// Simulated network/decoder.
pub struct SyntheticLoader {
	counts: CandidateTable,
	latency: Duration,
}

impl SyntheticLoader {
	pub fn new(counts: CandidateTable, latency_ms: u64) -> Self {
		Self {
			counts,
			latency: Duration::from_millis(latency_ms),
		}
	}
}

impl NodeLoader for SyntheticLoader {
	type Data = u64;

	fn load_node(&self, id: NodeId) -> Option<u64> {
		if !self.latency.is_zero() {
			std::thread::sleep(self.latency);
		}
		self.counts.get(&id).copied()
	}
}

/// Handle for one "uploaded" node.
pub struct NodeBuffer {
	id: NodeId,
	points: u64,
	shown: bool,
}

/// Tracks what a real renderer would hold in GPU memory and draw.
#[derive(Default)]
pub struct CountingRenderer {
	live: HashMap<NodeId, u64>,
	pub resident_points: u64,
	pub drawn_points: u64,
	pub drawn_nodes: usize,
	pub uploads: u64,
	pub disposals: u64,
}

impl CountingRenderer {
	pub fn resident_nodes(&self) -> usize {
		self.live.len()
	}
}

impl NodeRenderer for CountingRenderer {
	type Data = u64;
	type Handle = NodeBuffer;

	fn create(&mut self, id: NodeId, points: u64) -> NodeBuffer {
		self.uploads += 1;
		self.resident_points += points;
		self.live.insert(id, points);
		NodeBuffer {
			id,
			points,
			shown: false,
		}
	}

	fn set_visible(&mut self, handle: &mut NodeBuffer, visible: bool) {
		if handle.shown == visible {
			return;
		}
		handle.shown = visible;
		if visible {
			self.drawn_points += handle.points;
			self.drawn_nodes += 1;
		} else {
			self.drawn_points -= handle.points;
			self.drawn_nodes -= 1;
		}
	}

	fn dispose(&mut self, mut handle: NodeBuffer) {
		self.set_visible(&mut handle, false);
		self.disposals += 1;
		self.resident_points -= handle.points;
		self.live.remove(&handle.id);
	}
}
