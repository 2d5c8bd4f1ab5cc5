use super::*;
use crate::octree::LoadState;
use crate::test_utils::{
  away_camera, near_camera, sorted, table, unit_cube, MockLoader, RecordingRenderer,
};

type TestEngine = LodEngine<MockLoader, RecordingRenderer>;

const SCENARIO: &[(u64, u64)] = &[(1, 1000), (11, 200), (12, 200)];

fn engine_with(loader: MockLoader, entries: &[(u64, u64)]) -> TestEngine {
  let config = LodConfig {
    max_depth: 2,
    ..LodConfig::INLINE
  };
  let mut engine = LodEngine::new(loader, RecordingRenderer::default(), config).unwrap();
  engine.load_dataset(unit_cube(), &table(entries)).unwrap();
  engine
}

fn engine() -> TestEngine {
  engine_with(MockLoader::default(), SCENARIO)
}

/// Tick until nothing is queued or in flight.
fn settle(engine: &mut TestEngine) {
  for _ in 0..16 {
    engine.tick();
    if engine.is_idle() {
      return;
    }
  }
  panic!("engine did not settle");
}

fn loaded(engine: &TestEngine) -> Vec<u64> {
  sorted(engine.index().unwrap().loaded_ids().iter().copied())
}

// =========================================================================
// Preconditions
// =========================================================================

#[test]
fn test_calls_without_dataset_fail() {
  let mut engine: TestEngine =
    LodEngine::new(MockLoader::default(), RecordingRenderer::default(), LodConfig::INLINE).unwrap();

  assert!(matches!(engine.load_node(NodeId::ROOT), Err(LodError::IndexNotBuilt)));
  assert!(matches!(
    engine.update_camera(&near_camera()),
    Err(LodError::IndexNotBuilt)
  ));
  assert_eq!(engine.tick(), 0);
  assert!(!engine.update());
  assert_eq!(engine.stats().total_nodes, 0);
}

#[test]
fn test_unknown_node_rejected() {
  let mut engine = engine();
  assert!(matches!(
    engine.load_node(NodeId::new(15)),
    Err(LodError::UnknownNode(id)) if id == NodeId::new(15)
  ));
}

#[test]
fn test_invalid_config_rejected() {
  let config = LodConfig {
    max_parallel_loads: 0,
    ..LodConfig::INLINE
  };
  assert!(LodEngine::new(MockLoader::default(), RecordingRenderer::default(), config).is_err());

  let mut engine = engine();
  assert!(matches!(
    engine.set_max_parallel_loads(0),
    Err(LodError::Precondition(_))
  ));
  engine.set_max_parallel_loads(4).unwrap();
  assert_eq!(engine.config().max_parallel_loads, 4);
}

// =========================================================================
// Streaming
// =========================================================================

#[test]
fn test_visible_nodes_load_and_show() {
  let mut engine = engine();
  assert_eq!(engine.update_camera(&near_camera()).unwrap(), 3);
  settle(&mut engine);

  assert_eq!(loaded(&engine), vec![1, 11, 12]);
  for raw in [1, 11, 12] {
    assert!(engine.renderer().is_shown(raw));
  }
  assert_eq!(engine.loader().calls(), crate::test_utils::ids(&[1, 11, 12]));
  assert_eq!(
    engine.drain_events(),
    vec![LoadEvent::BatchStarted, LoadEvent::BatchFinished]
  );
}

#[test]
fn test_camera_change_hides_departed_nodes() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  assert_eq!(engine.update_camera(&away_camera()).unwrap(), 0);
  assert!(engine.renderer().is_shown(1));
  assert!(!engine.renderer().is_shown(11));
  assert!(!engine.renderer().is_shown(12));
  // Still cached; coming back shows them without reloading.
  assert_eq!(loaded(&engine), vec![1, 11, 12]);

  assert_eq!(engine.update_camera(&near_camera()).unwrap(), 0);
  assert!(engine.renderer().is_shown(11));
  assert_eq!(engine.renderer().created.len(), 3);
}

#[test]
fn test_node_loaded_after_leaving_view_stays_hidden() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  engine.tick(); // starts 1 and 11
  engine.update_camera(&away_camera()).unwrap();
  settle(&mut engine);

  assert!(engine.renderer().is_shown(1));
  assert!(!engine.renderer().is_shown(11));
  assert!(!engine.renderer().is_shown(12));
}

#[test]
fn test_failed_load_retried_on_next_pass() {
  let mut engine = engine_with(MockLoader::failing(&[12]), SCENARIO);
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  let node = engine.index().unwrap().get(NodeId::new(12)).unwrap();
  assert_eq!(node.load_state(), LoadState::Unloaded);
  assert_eq!(engine.stats().failed_loads, 1);

  assert_eq!(engine.update_camera(&near_camera()).unwrap(), 1);
}

#[test]
fn test_explicit_load_node() {
  let mut engine = engine();
  assert!(engine.load_node(NodeId::new(12)).unwrap());
  assert!(!engine.load_node(NodeId::new(12)).unwrap());
  settle(&mut engine);

  assert_eq!(loaded(&engine), vec![12]);
  // Not visible yet, so not shown.
  assert!(!engine.renderer().is_shown(12));
}

// =========================================================================
// Invalidation and lifecycle
// =========================================================================

/// Invalidation disposes every payload and reloads the visible set.
#[test]
fn test_invalidation_completeness() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  engine.invalidate_all();
  let index = engine.index().unwrap();
  assert!(index.loaded_ids().is_empty());
  assert!(index.loading_ids().is_empty());
  assert!(index.ids().all(|id| index.get(id).unwrap().payload().is_none()));
  assert_eq!(sorted(engine.renderer().disposed.iter().copied()), vec![1, 11, 12]);
  assert_eq!(engine.renderer().live(), 0);
  assert_eq!(engine.stats().queued, 3);

  settle(&mut engine);
  assert_eq!(loaded(&engine), vec![1, 11, 12]);
  assert_eq!(engine.renderer().live(), 3);
}

#[test]
fn test_invalidate_during_load_drops_stale_result() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  engine.tick(); // 1 and 11 in flight
  engine.invalidate_all();
  settle(&mut engine);

  assert_eq!(engine.stats().stale_discarded, 2);
  assert_eq!(loaded(&engine), vec![1, 11, 12]);
  // Stale results never reached the renderer.
  assert_eq!(engine.renderer().created.len(), 3);
}

#[test]
fn test_unload_disposes_everything() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  engine.unload_dataset();
  assert!(!engine.has_dataset());
  assert_eq!(engine.renderer().live(), 0);
  assert_eq!(engine.renderer().disposed.len(), 3);
  assert_eq!(engine.stats(), EngineStats {
    completed_loads: 3,
    avg_load_us: engine.stats().avg_load_us,
    min_load_us: engine.stats().min_load_us,
    max_load_us: engine.stats().max_load_us,
    last_visibility_us: engine.stats().last_visibility_us,
    ..Default::default()
  });
}

#[test]
fn test_unload_with_loads_in_flight_finishes_batch() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  engine.tick(); // 1 and 11 in flight
  engine.unload_dataset();
  assert!(!engine.is_idle());

  assert!(engine.update());
  assert!(engine.is_idle());
  let stats = engine.stats();
  assert_eq!(stats.in_flight, 0);
  assert_eq!(stats.stale_discarded, 2);
  assert_eq!(
    engine.drain_events(),
    vec![LoadEvent::BatchStarted, LoadEvent::BatchFinished]
  );
  assert!(engine.renderer().created.is_empty());
  // Pump is disarmed once idle.
  assert!(!engine.update());
}

#[test]
fn test_replacing_dataset_disposes_old_payloads() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  engine
    .load_dataset(unit_cube(), &table(&[(1, 5), (13, 5)]))
    .unwrap();
  assert_eq!(engine.renderer().live(), 0);
  assert_eq!(engine.index().unwrap().len(), 2);
  assert!(engine.visible_ids().unwrap().is_empty());
}

#[test]
fn test_bad_table_keeps_current_dataset() {
  let mut engine = engine();
  let err = engine
    .load_dataset(unit_cube(), &table(&[(1, 5), (123, 5)]))
    .unwrap_err();
  assert!(matches!(err, LodError::StructuralIntegrity { .. }));
  assert_eq!(engine.index().unwrap().len(), 3);
}

// =========================================================================
// Display switch
// =========================================================================

#[test]
fn test_disabled_engine_shows_nothing() {
  let mut engine = engine();
  engine.all_hide();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);

  assert_eq!(loaded(&engine), vec![1, 11, 12]);
  assert!(!engine.is_enabled());
  for raw in [1, 11, 12] {
    assert!(!engine.renderer().is_shown(raw));
  }

  engine.all_show();
  for raw in [1, 11, 12] {
    assert!(engine.renderer().is_shown(raw));
  }
}

#[test]
fn test_show_after_hide_keeps_out_of_view_nodes_hidden() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();
  settle(&mut engine);
  engine.update_camera(&away_camera()).unwrap();

  engine.all_hide();
  engine.all_show();
  assert!(engine.renderer().is_shown(1));
  assert!(!engine.renderer().is_shown(11));
  assert!(!engine.renderer().is_shown(12));

  engine.update_camera(&away_camera()).unwrap();
  assert!(!engine.renderer().is_shown(11));
  assert!(!engine.renderer().is_shown(12));

  engine.update_camera(&near_camera()).unwrap();
  for raw in [1, 11, 12] {
    assert!(engine.renderer().is_shown(raw));
  }
}

#[test]
fn test_stats_track_visibility_and_loads() {
  let mut engine = engine();
  engine.update_camera(&near_camera()).unwrap();

  let stats = engine.stats();
  assert_eq!(stats.total_nodes, 3);
  assert_eq!(stats.visible_nodes, 3);
  assert_eq!(stats.visible_points, 1400);
  assert_eq!(stats.queued, 3);

  settle(&mut engine);
  let stats = engine.stats();
  assert_eq!(stats.loaded_nodes, 3);
  assert_eq!(stats.completed_loads, 3);
  assert_eq!(stats.in_flight, 0);
  assert_eq!(stats.loaded_ratio(), 1.0);
  assert!(stats.min_load_us <= stats.max_load_us);
}
