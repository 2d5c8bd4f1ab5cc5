//! Replay configuration: dataset bounds, candidate table and camera path.
//!
//! ```toml
//! frames = 300
//! candidates = "candidates.json"
//!
//! [dataset]
//! min = [0.0, 0.0, 0.0]
//! max = [512.0, 512.0, 128.0]
//!
//! [camera]
//! fov_deg = 60.0
//! viewport = [1920, 1080]
//!
//! [[camera.keyframes]]
//! position = [256.0, -400.0, 300.0]
//! target = [256.0, 256.0, 0.0]
//!
//! [lod]
//! max_parallel_loads = 4
//! ```
//!
//! Positions use the dataset's z-up coordinates and are converted to the
//! engine's y-up render space on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::{DVec3, UVec2};
use pointcloud_lod::{CameraState, CandidateTable, DAabb3, LodConfig, NodeId};
use serde::Deserialize;

/// Root configuration for a replay run.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Number of frames to simulate.
	#[serde(default = "default_frames")]
	pub frames: u32,
	/// Simulated frame time in milliseconds.
	#[serde(default = "default_frame_ms")]
	pub frame_ms: u64,
	/// Candidate table JSON, relative to the config file.
	pub candidates: PathBuf,
	/// Artificial latency per node load, in milliseconds.
	#[serde(default)]
	pub load_latency_ms: u64,
	pub dataset: DatasetConfig,
	pub camera: CameraConfig,
	/// Engine settings; omitted fields keep their defaults.
	#[serde(default)]
	pub lod: LodConfig,
}

/// Dataset bounding box in source (z-up) coordinates.
#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
	pub min: [f64; 3],
	pub max: [f64; 3],
}

#[derive(Debug, Deserialize)]
pub struct CameraConfig {
	#[serde(default = "default_fov")]
	pub fov_deg: f64,
	#[serde(default = "default_viewport")]
	pub viewport: [u32; 2],
	#[serde(default = "default_near")]
	pub near: f64,
	#[serde(default = "default_far")]
	pub far: f64,
	/// Camera path; frames interpolate linearly between keyframes.
	pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Keyframe {
	pub position: [f64; 3],
	pub target: [f64; 3],
}

fn default_frames() -> u32 {
	240
}

fn default_frame_ms() -> u64 {
	16
}

fn default_fov() -> f64 {
	60.0
}

fn default_viewport() -> [u32; 2] {
	[1920, 1080]
}

fn default_near() -> f64 {
	0.1
}

fn default_far() -> f64 {
	100_000.0
}

/// z-up source coordinates to y-up render space.
fn z_up(v: [f64; 3]) -> DVec3 {
	DVec3::new(v[0], v[2], v[1])
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let mut config: Config =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;

		if config.camera.keyframes.is_empty() {
			anyhow::bail!("Config must have at least one camera keyframe");
		}
		if config.frames == 0 {
			anyhow::bail!("frames must be at least 1");
		}
		let [min, max] = [config.dataset.min, config.dataset.max];
		if (0..3).any(|axis| min[axis] >= max[axis]) {
			anyhow::bail!("dataset min {:?} must be below max {:?}", min, max);
		}
		config.lod.validate().context("Invalid [lod] section")?;

		if config.candidates.is_relative() {
			let base = path.parent().unwrap_or(Path::new("."));
			config.candidates = base.join(&config.candidates);
		}
		Ok(config)
	}

	pub fn root_box(&self) -> DAabb3 {
		DAabb3::from_z_up(
			DVec3::from_array(self.dataset.min),
			DVec3::from_array(self.dataset.max),
		)
	}

	/// Camera for `frame`, interpolated along the keyframes.
	pub fn camera_at(&self, frame: u32) -> CameraState {
		let keys = &self.camera.keyframes;
		let (from, to, t) = if keys.len() == 1 || self.frames <= 1 {
			(keys[0], keys[0], 0.0)
		} else {
			let progress = frame.min(self.frames - 1) as f64 / (self.frames - 1) as f64;
			let scaled = progress * (keys.len() - 1) as f64;
			let segment = (scaled.floor() as usize).min(keys.len() - 2);
			(keys[segment], keys[segment + 1], scaled - segment as f64)
		};
		let position = z_up(from.position).lerp(z_up(to.position), t);
		let target = z_up(from.target).lerp(z_up(to.target), t);
		CameraState::look_at(
			position,
			target,
			self.camera.fov_deg.to_radians(),
			UVec2::from_array(self.camera.viewport),
			self.camera.near,
			self.camera.far,
		)
	}
}

/// Read a candidate table: a JSON object mapping node ids to point counts,
/// e.g. `{"1": 52000, "11": 14000, "13": 9000}`.
pub fn load_candidates(path: &Path) -> Result<CandidateTable> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read candidate table: {}", path.display()))?;
	let raw: HashMap<String, u64> = serde_json::from_str(&content)
		.with_context(|| format!("Failed to parse candidate table: {}", path.display()))?;

	raw.into_iter()
		.map(|(key, points)| {
			let id: u64 = key
				.parse()
				.with_context(|| format!("Node id {key:?} is not an integer"))?;
			Ok((NodeId::new(id), points))
		})
		.collect()
}
