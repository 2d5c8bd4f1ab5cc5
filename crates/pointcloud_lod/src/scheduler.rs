//! Load scheduler: priority queue of nodes to fetch plus a bounded pump.
//!
//! Following the stage pattern: Reconcile → Tick → Completions
//!
//! ```text
//! Owning thread                          Load pool ("lod-load-{i}")
//! ┌──────────────────┐
//! │ reconcile(ids)   │  queue += ids not loaded/loading/queued
//! └────────┬─────────┘
//!          │ tick()
//!          ▼
//! ┌──────────────────┐                   ┌──────────────────┐
//! │ drain channel    │◄──── Completion ──┤ loader.load_node │
//! │ start lowest ids ├──── spawn ───────►│                  │
//! └──────────────────┘                   └──────────────────┘
//! ```
//!
//! Ids pop in ascending numeric order, so parents always start before their
//! descendants (coarse before fine). Completions carry the cache generation
//! they were started under; results from before an invalidation are dropped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, Sender};
use tracing::{debug, trace};
use web_time::{Duration, Instant};

use crate::config::{LoadExecution, LodConfig};
use crate::error::LodError;
use crate::host::NodeLoader;
use crate::octree::{NodeId, OctreeIndex};
use crate::stats::RollingWindow;

/// Lifecycle signals for hosts that show a loading indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadEvent {
  /// The first load of a batch was started.
  BatchStarted,
  /// Queue empty and nothing in flight.
  BatchFinished,
}

/// Result of one loader call, sent back to the owning thread.
struct Completion<D> {
  id: NodeId,
  generation: u64,
  data: Option<D>,
  load_us: u64,
}

/// Tick pacing. Armed whenever work may be pending.
#[derive(Clone, Copy, Debug, Default)]
struct Pump {
  armed: bool,
  /// Earliest time of the next tick; `None` ticks on the next `update`.
  next_tick: Option<Instant>,
}

/// Priority-ordered, concurrency-bounded node loading.
pub struct LoadScheduler<L: NodeLoader> {
  loader: Arc<L>,
  queue: BinaryHeap<Reverse<NodeId>>,
  queued: HashSet<NodeId>,
  /// Dispatched loads whose completion has not been drained.
  in_flight: usize,
  max_parallel_loads: usize,
  max_starts_per_tick: usize,
  tick_interval: Duration,
  execution: LoadExecution,
  pool: Option<rayon::ThreadPool>,
  sender: Sender<Completion<L::Data>>,
  receiver: Receiver<Completion<L::Data>>,
  generation: u64,
  pump: Pump,
  busy: bool,
  events: Vec<LoadEvent>,
  load_timings: RollingWindow<u64>,
  completed: u64,
  failed: u64,
  stale_discarded: u64,
}

impl<L: NodeLoader> LoadScheduler<L> {
  pub fn new(loader: Arc<L>, config: &LodConfig) -> Result<Self, LodError> {
    if config.max_parallel_loads == 0 {
      return Err(LodError::Precondition("max_parallel_loads must be > 0"));
    }
    let pool = match config.execution {
      LoadExecution::Pool => Some(build_pool(config.max_parallel_loads)?),
      LoadExecution::Inline => None,
    };
    let (sender, receiver) = channel::unbounded();
    Ok(Self {
      loader,
      queue: BinaryHeap::new(),
      queued: HashSet::new(),
      in_flight: 0,
      max_parallel_loads: config.max_parallel_loads,
      max_starts_per_tick: config.max_starts_per_tick,
      tick_interval: config.tick_interval(),
      execution: config.execution,
      pool,
      sender,
      receiver,
      generation: 0,
      pump: Pump::default(),
      busy: false,
      events: Vec::new(),
      load_timings: RollingWindow::default(),
      completed: 0,
      failed: 0,
      stale_discarded: 0,
    })
  }

  /// Queue every candidate that is neither loaded, loading nor queued, and
  /// re-arm the pump. Returns the number of newly queued ids.
  pub fn reconcile<P>(
    &mut self,
    index: &OctreeIndex<P>,
    candidates: impl IntoIterator<Item = NodeId>,
  ) -> usize {
    let mut added = 0;
    for id in candidates {
      if index.is_loaded(id) || index.is_loading(id) {
        continue;
      }
      if self.queued.insert(id) {
        self.queue.push(Reverse(id));
        added += 1;
      }
    }
    if added > 0 {
      trace!(added, queued = self.queue.len(), "reconciled load queue");
    }
    self.arm();
    added
  }

  /// Start a load for `id` now if a slot is free, otherwise queue it.
  ///
  /// Returns true when the load was dispatched. Loaded or loading nodes are
  /// left alone.
  pub fn load_node<P>(&mut self, index: &mut OctreeIndex<P>, id: NodeId) -> bool {
    if index.is_loaded(id) || index.is_loading(id) {
      return false;
    }
    if self.in_flight >= self.max_parallel_loads {
      if self.queued.insert(id) {
        self.queue.push(Reverse(id));
      }
      self.arm();
      return false;
    }
    if !index.mark_loading(id) {
      return false;
    }
    self.queued.remove(&id);
    self.dispatch(id);
    self.arm();
    true
  }

  /// Tick if the pump is armed and its deadline has passed.
  ///
  /// `apply` receives each successful load; failed loads are reverted here.
  pub fn update<P>(
    &mut self,
    now: Instant,
    index: &mut OctreeIndex<P>,
    apply: impl FnMut(&mut OctreeIndex<P>, NodeId, L::Data),
  ) -> bool {
    if !self.is_due(now) {
      return false;
    }
    self.tick_at(now, index, apply);
    true
  }

  pub fn is_due(&self, now: Instant) -> bool {
    self.pump.armed && self.pump.next_tick.map_or(true, |deadline| now >= deadline)
  }

  /// Drain finished loads, then start queued loads within budget.
  pub fn tick<P>(
    &mut self,
    index: &mut OctreeIndex<P>,
    apply: impl FnMut(&mut OctreeIndex<P>, NodeId, L::Data),
  ) -> usize {
    self.tick_at(Instant::now(), index, apply)
  }

  #[tracing::instrument(skip_all, name = "scheduler::tick")]
  fn tick_at<P>(
    &mut self,
    now: Instant,
    index: &mut OctreeIndex<P>,
    apply: impl FnMut(&mut OctreeIndex<P>, NodeId, L::Data),
  ) -> usize {
    self.drain_completions(index, apply);

    let mut started = 0;
    while self.in_flight < self.max_parallel_loads && self.can_start(started) {
      let Some(Reverse(id)) = self.queue.pop() else {
        break;
      };
      self.queued.remove(&id);
      // Loaded by an explicit request, or gone with a replaced dataset.
      if !index.mark_loading(id) {
        continue;
      }
      self.dispatch(id);
      started += 1;
    }

    self.finish_batch_if_idle();
    self.pump.next_tick = Some(now + self.tick_interval);
    started
  }

  /// `update` for a scheduler with no dataset attached.
  pub fn update_detached(&mut self, now: Instant) -> bool {
    if !self.is_due(now) {
      return false;
    }
    self.tick_detached(now);
    true
  }

  /// Drain loads started before `clear`. Their results are discarded.
  pub fn tick_detached(&mut self, now: Instant) {
    while let Ok(done) = self.receiver.try_recv() {
      self.in_flight = self.in_flight.saturating_sub(1);
      self.stale_discarded += 1;
      trace!(node = %done.id, "discarding load for dropped dataset");
    }
    self.finish_batch_if_idle();
    self.pump.next_tick = Some(now + self.tick_interval);
  }

  fn finish_batch_if_idle(&mut self) {
    if !self.is_idle() {
      return;
    }
    if self.busy {
      self.busy = false;
      self.events.push(LoadEvent::BatchFinished);
      debug!(completed = self.completed, failed = self.failed, "load batch finished");
    }
    self.pump.armed = false;
  }

  fn drain_completions<P>(
    &mut self,
    index: &mut OctreeIndex<P>,
    mut apply: impl FnMut(&mut OctreeIndex<P>, NodeId, L::Data),
  ) {
    while let Ok(done) = self.receiver.try_recv() {
      self.in_flight = self.in_flight.saturating_sub(1);
      self.load_timings.push(done.load_us);

      if done.generation != self.generation {
        self.stale_discarded += 1;
        trace!(node = %done.id, "discarding load from before invalidation");
        continue;
      }
      match done.data {
        Some(data) => {
          self.completed += 1;
          apply(index, done.id, data);
        }
        None => {
          self.failed += 1;
          index.mark_failed(done.id);
        }
      }
    }
  }

  fn dispatch(&mut self, id: NodeId) {
    if !self.busy {
      self.busy = true;
      self.events.push(LoadEvent::BatchStarted);
    }
    self.in_flight += 1;

    let loader = Arc::clone(&self.loader);
    let sender = self.sender.clone();
    let generation = self.generation;
    let job = move || {
      let start = Instant::now();
      let data = loader.load_node(id);
      let load_us = start.elapsed().as_micros() as u64;
      // Receiver lives as long as the scheduler; a send error means it is gone.
      let _ = sender.send(Completion {
        id,
        generation,
        data,
        load_us,
      });
    };
    match &self.pool {
      Some(pool) => pool.spawn(job),
      None => job(),
    }
    trace!(node = %id, in_flight = self.in_flight, "load started");
  }

  /// Drop the queue, re-queue `visible` and mark every in-flight load stale.
  ///
  /// The caller resets the node cache; see `OctreeIndex::invalidate_all`.
  pub fn invalidate(&mut self, visible: impl IntoIterator<Item = NodeId>) {
    self.generation += 1;
    self.queue.clear();
    self.queued.clear();
    for id in visible {
      if self.queued.insert(id) {
        self.queue.push(Reverse(id));
      }
    }
    debug!(generation = self.generation, requeued = self.queue.len(), "load cache invalidated");
    self.arm();
  }

  /// Forget all queued work, e.g. when the dataset is dropped.
  ///
  /// Loads still in flight become stale; the batch finishes once they are
  /// drained by `tick_detached` or a later `tick`.
  pub fn clear(&mut self) {
    self.generation += 1;
    self.queue.clear();
    self.queued.clear();
    if self.in_flight > 0 {
      self.arm();
    } else {
      self.finish_batch_if_idle();
    }
  }

  /// Change the concurrency limit. Loads already in flight finish normally.
  pub fn set_max_parallel_loads(&mut self, max: usize) -> Result<(), LodError> {
    if max == 0 {
      return Err(LodError::Precondition("max_parallel_loads must be > 0"));
    }
    if max != self.max_parallel_loads && self.execution == LoadExecution::Pool {
      self.pool = Some(build_pool(max)?);
    }
    debug!(from = self.max_parallel_loads, to = max, "max parallel loads changed");
    self.max_parallel_loads = max;
    self.arm();
    Ok(())
  }

  /// Take all pending lifecycle events.
  pub fn drain_events(&mut self) -> Vec<LoadEvent> {
    std::mem::take(&mut self.events)
  }

  #[inline]
  fn can_start(&self, started_this_tick: usize) -> bool {
    self.max_starts_per_tick == 0 || started_this_tick < self.max_starts_per_tick
  }

  fn arm(&mut self) {
    self.pump.armed = true;
    self.pump.next_tick = None;
  }

  /// True when nothing is queued and nothing is in flight.
  pub fn is_idle(&self) -> bool {
    self.queue.is_empty() && self.in_flight == 0
  }

  pub fn queue_len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_queued(&self, id: NodeId) -> bool {
    self.queued.contains(&id)
  }

  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  pub fn max_parallel_loads(&self) -> usize {
    self.max_parallel_loads
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn load_timings(&self) -> &RollingWindow<u64> {
    &self.load_timings
  }

  pub fn completed_loads(&self) -> u64 {
    self.completed
  }

  pub fn failed_loads(&self) -> u64 {
    self.failed
  }

  pub fn stale_discarded(&self) -> u64 {
    self.stale_discarded
  }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool, LodError> {
  let pool = rayon::ThreadPoolBuilder::new()
    .num_threads(threads)
    .thread_name(|i| format!("lod-load-{i}"))
    .build()?;
  Ok(pool)
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
