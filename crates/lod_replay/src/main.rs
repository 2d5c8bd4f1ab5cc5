//! Point-cloud LOD replay.
//!
//! Flies a camera along a keyframed path over a candidate table and drives
//! the streaming engine frame by frame, printing how many nodes are visible,
//! loading and resident as it goes.
//!
//! Loads are simulated: each one sleeps for `load_latency_ms` and yields the
//! node's point count, so the run exercises scheduling and visibility without
//! any real point data.

mod config;
mod synthetic;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pointcloud_lod::{EngineStats, LoadEvent, LodEngine};
use serde::Serialize;
use web_time::{Duration, Instant};

use config::{load_candidates, Config};
use synthetic::{CountingRenderer, SyntheticLoader};

/// Point-cloud LOD streaming replay.
#[derive(Parser, Debug)]
#[command(name = "lod_replay")]
#[command(about = "Replays a camera path against a point-cloud octree")]
struct Args {
	/// Path to replay configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Override the number of frames from the config.
	#[arg(short, long)]
	frames: Option<u32>,

	/// Print a status line every N frames (0 = only the summary).
	#[arg(long, default_value_t = 30)]
	report_every: u32,

	/// Seconds to keep ticking after the last frame for loads to finish.
	#[arg(long, default_value_t = 10)]
	drain_timeout: u64,

	/// Print the final summary as JSON.
	#[arg(long)]
	json: bool,
}

/// Final numbers of a replay run.
#[derive(Debug, Serialize)]
struct Summary {
	frames: u32,
	nodes: usize,
	visible_nodes: usize,
	visible_points: u64,
	loaded_nodes: usize,
	resident_points: u64,
	drawn_points: u64,
	completed_loads: u64,
	failed_loads: u64,
	batches: u32,
	avg_load_us: f64,
	min_load_us: u64,
	max_load_us: u64,
	elapsed_ms: u128,
	drained: bool,
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	println!("Loading config from: {}", args.config.display());
	let mut config = Config::load(&args.config)?;
	if let Some(frames) = args.frames {
		config.frames = frames.max(1);
	}

	let candidates = load_candidates(&config.candidates)?;
	println!(
		"Replaying {} frames over {} candidate nodes",
		config.frames,
		candidates.len()
	);

	let loader = SyntheticLoader::new(candidates.clone(), config.load_latency_ms);
	let mut engine = LodEngine::new(loader, CountingRenderer::default(), config.lod.clone())
		.context("Failed to start streaming engine")?;
	engine
		.load_dataset(config.root_box(), &candidates)
		.context("Candidate table does not form a valid octree")?;

	let started = Instant::now();
	let frame_time = Duration::from_millis(config.frame_ms);
	let mut batches = 0;

	for frame in 0..config.frames {
		let queued = engine.update_camera(&config.camera_at(frame))?;
		engine.update();
		batches += count_finished(&mut engine);

		if args.report_every > 0 && frame % args.report_every == 0 {
			print_status(frame, queued, &engine.stats(), engine.renderer());
		}
		std::thread::sleep(frame_time);
	}

	let deadline = Instant::now() + Duration::from_secs(args.drain_timeout);
	while !engine.is_idle() && Instant::now() < deadline {
		engine.update();
		batches += count_finished(&mut engine);
		std::thread::sleep(frame_time);
	}

	let stats = engine.stats();
	let renderer = engine.renderer();
	let summary = Summary {
		frames: config.frames,
		nodes: stats.total_nodes,
		visible_nodes: stats.visible_nodes,
		visible_points: stats.visible_points,
		loaded_nodes: stats.loaded_nodes,
		resident_points: renderer.resident_points,
		drawn_points: renderer.drawn_points,
		completed_loads: stats.completed_loads,
		failed_loads: stats.failed_loads,
		batches,
		avg_load_us: stats.avg_load_us,
		min_load_us: stats.min_load_us,
		max_load_us: stats.max_load_us,
		elapsed_ms: started.elapsed().as_millis(),
		drained: engine.is_idle(),
	};

	if args.json {
		println!("{}", serde_json::to_string_pretty(&summary)?);
	} else {
		println!("\nDone after {} ms", summary.elapsed_ms);
		println!(
			"  visible: {} nodes / {} points",
			summary.visible_nodes, summary.visible_points
		);
		println!(
			"  resident: {} nodes / {} points ({} drawn)",
			summary.loaded_nodes, summary.resident_points, summary.drawn_points
		);
		println!(
			"  loads: {} ok, {} empty, {} batches, avg {:.2} ms ({:.2}..{:.2})",
			summary.completed_loads,
			summary.failed_loads,
			summary.batches,
			summary.avg_load_us / 1000.0,
			summary.min_load_us as f64 / 1000.0,
			summary.max_load_us as f64 / 1000.0
		);
		if !summary.drained {
			println!("  warning: loads still pending after {}s", args.drain_timeout);
		}
	}

	Ok(())
}

/// Drain engine events, returning how many load batches finished.
fn count_finished(engine: &mut LodEngine<SyntheticLoader, CountingRenderer>) -> u32 {
	let mut finished = 0;
	for event in engine.drain_events() {
		match event {
			LoadEvent::BatchStarted => info!("loading..."),
			LoadEvent::BatchFinished => {
				info!("all queued nodes loaded");
				finished += 1;
			}
		}
	}
	finished
}

fn print_status(frame: u32, queued: usize, stats: &EngineStats, renderer: &CountingRenderer) {
	println!(
		"frame {:>5}: visible {:>5} ({:>9} pts)  +{:<3} queued {:>4}  loading {:>2}  resident {:>5}  drawn {:>5}",
		frame,
		stats.visible_nodes,
		stats.visible_points,
		queued,
		stats.queued,
		stats.loading_nodes,
		renderer.resident_nodes(),
		renderer.drawn_nodes,
	);
}
