//! Lifecycle tests for `SystemManager`.
//!
//! These tests drive the manager through a `ScriptedEngine` and check caching,
//! graceful degradation, reset and teardown behavior.

use std::sync::Arc;

use keystone_lifecycle::error::{EngineError, StartupError};
use keystone_lifecycle::id::ResourceId;
use keystone_lifecycle::manager::{SystemManager, create_system_manager};
use keystone_lifecycle::testing::{ScriptedEngine, ScriptedGraph};
use tokio::sync::Notify;
use tokio_test::{assert_pending, assert_ready};

#[derive(Debug, PartialEq)]
struct Value {
    value: i32,
}

fn healthy_graph() -> ScriptedGraph {
    ScriptedGraph::new()
        .with_resource("a", || Value { value: 1 })
        .with_resource("b", || Value { value: 2 })
}

fn degraded_graph() -> ScriptedGraph {
    ScriptedGraph::new()
        .with_resource("a", || Value { value: 1 })
        .with_failure("b", "boom")
}

fn gated(graph: ScriptedGraph) -> (SystemManager<ScriptedEngine>, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let engine = ScriptedEngine::new().with_gate(Arc::clone(&gate));
    (create_system_manager(engine, graph), gate)
}

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthy_startup_resolves_full_system() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    let system = manager.get_system().await.unwrap();

    assert_eq!(system.resource::<Value>("a").as_deref(), Some(&Value { value: 1 }));
    assert_eq!(system.resource::<Value>("b").as_deref(), Some(&Value { value: 2 }));
    assert!(manager.startup_errors().unwrap().is_empty());
    assert!(manager.is_started());
}

#[tokio::test]
async fn degraded_startup_resolves_partial_system() {
    let manager = create_system_manager(ScriptedEngine::new(), degraded_graph());

    // Per-resource failures never reject the startup.
    let system = manager.get_system().await.unwrap();
    assert!(system.contains("a"));
    assert!(!system.contains("b"));

    let current = manager.current_system().unwrap();
    assert!(Arc::ptr_eq(&current, &system));

    let errors = manager.startup_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get("b").unwrap().message(), "boom");
    assert!(manager.is_started());
}

#[tokio::test]
async fn cached_system_is_returned_without_restarting() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    let first = manager.get_system().await.unwrap();
    let second = manager.get_system().await.unwrap();
    let third = manager.get_system().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
    assert_eq!(manager.engine().start_count(), 1);
}

#[tokio::test]
async fn startup_is_pending_until_engine_finishes() {
    let (manager, gate) = gated(healthy_graph());

    let startup = manager.get_system();
    let mut observer = tokio_test::task::spawn(startup.clone());
    assert_pending!(observer.poll());
    assert!(!manager.is_started());

    gate.notify_one();
    let system = startup.await.unwrap();

    assert!(observer.is_woken());
    let observed = assert_ready!(observer.poll()).unwrap();
    assert!(Arc::ptr_eq(&observed, &system));
}

#[tokio::test]
async fn is_starting_tracks_in_flight_startup() {
    let (manager, gate) = gated(healthy_graph());
    assert!(!manager.is_starting());

    let startup = manager.get_system();
    assert!(manager.is_starting());
    assert!(!startup.is_settled());

    gate.notify_one();
    startup.await.unwrap();

    assert!(!manager.is_starting());
    assert!(manager.is_started());
}

#[tokio::test]
async fn dropped_startup_still_completes() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    drop(manager.get_system());

    for _ in 0..16 {
        if manager.is_started() {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert!(manager.is_started());
    assert_eq!(manager.engine().start_count(), 1);
}

#[tokio::test]
async fn timeout_race_does_not_lose_the_outcome() {
    let (manager, gate) = gated(healthy_graph());

    let raced = tokio::time::timeout(
        std::time::Duration::from_millis(10),
        manager.get_system(),
    )
    .await;
    assert!(raced.is_err());
    assert!(!manager.is_started());

    gate.notify_one();
    let system = manager.get_system().await.unwrap();

    assert!(manager.is_started());
    assert_eq!(system.len(), 2);
    assert_eq!(manager.engine().start_count(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Structural failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn structural_failure_rejects_startup() {
    let engine = ScriptedEngine::new().rejecting_start(EngineError::invalid_config("cycle"));
    let manager = create_system_manager(engine, healthy_graph());

    let err = manager.get_system().await.unwrap_err();

    assert_eq!(
        err,
        StartupError::Engine(EngineError::InvalidConfig("cycle".into()))
    );
    assert!(!manager.is_started());
    assert!(manager.startup_errors().is_none());
    assert_eq!(manager.startup_failure(), Some(err));
}

#[tokio::test]
async fn structural_failure_is_memoized_until_reset() {
    let engine = ScriptedEngine::new().rejecting_start(EngineError::engine("down"));
    let manager = create_system_manager(engine, healthy_graph());

    manager.get_system().await.unwrap_err();

    let again = manager.get_system();
    assert!(again.is_settled());
    assert!(again.await.is_err());
    assert_eq!(manager.engine().start_count(), 1);

    manager.destroy_system().await.unwrap();
    assert!(manager.startup_failure().is_none());
    assert_eq!(manager.cycle(), 1);

    manager.get_system().await.unwrap_err();
    assert_eq!(manager.engine().start_count(), 2);
    assert_eq!(manager.engine().halt_count(), 0);
}

#[tokio::test]
async fn engine_panic_rejects_startup_and_clears_pending() {
    let engine = ScriptedEngine::new().panicking_start("engine exploded");
    let manager = create_system_manager(engine, healthy_graph());

    let err = manager.get_system().await.unwrap_err();

    assert!(matches!(&err, StartupError::Aborted(reason) if reason.contains("engine exploded")));
    assert!(!manager.is_starting());
    assert!(!manager.is_started());
    assert_eq!(manager.startup_failure(), Some(err));

    // Memoized like any other rejection until reset.
    assert!(manager.get_system().is_settled());
    assert_eq!(manager.engine().start_count(), 1);

    manager.destroy_system().await.unwrap();
    assert!(manager.startup_failure().is_none());
    assert_eq!(manager.engine().halt_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Teardown
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn destroy_resets_and_next_startup_is_fresh() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    let first = manager.get_system().await.unwrap();
    manager.destroy_system().await.unwrap();

    assert!(!manager.is_started());
    assert!(manager.current_system().is_none());
    assert!(manager.startup_errors().is_none());

    let second = manager.get_system().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.resource::<Value>("a").as_deref(), Some(&Value { value: 1 }));
    assert_eq!(second.resource::<Value>("b").as_deref(), Some(&Value { value: 2 }));
    assert_eq!(manager.engine().start_count(), 2);
}

#[tokio::test]
async fn destroy_halts_in_reverse_order() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    manager.get_system().await.unwrap();
    manager.destroy_system().await.unwrap();

    let halted = manager.engine().halted();
    assert_eq!(halted.len(), 1);
    assert_eq!(halted[0], ["b", "a"]);
}

#[tokio::test]
async fn destroy_without_startup_is_noop() {
    let manager = create_system_manager(ScriptedEngine::new(), healthy_graph());

    manager.destroy_system().await.unwrap();
    manager.destroy_system().await.unwrap();

    assert_eq!(manager.engine().halt_count(), 0);
    assert_eq!(manager.engine().start_count(), 0);
}

#[tokio::test]
async fn destroy_waits_for_in_flight_startup() {
    let (manager, gate) = gated(healthy_graph());

    let startup = manager.get_system();
    let teardown = tokio::spawn({
        let manager = manager.clone();
        async move { manager.destroy_system().await }
    });

    tokio::task::yield_now().await;
    assert_eq!(manager.engine().halt_count(), 0);

    gate.notify_one();
    teardown.await.unwrap().unwrap();

    // The startup finished, was halted, and the cache was cleared.
    assert!(startup.await.is_ok());
    assert_eq!(manager.engine().halt_count(), 1);
    assert!(!manager.is_started());
}

#[tokio::test]
async fn halt_resource_failures_do_not_block_reset() {
    let engine = ScriptedEngine::new().with_halt_failure("a", "stuck");
    let manager = create_system_manager(engine, healthy_graph());

    manager.get_system().await.unwrap();
    manager.destroy_system().await.unwrap();

    assert!(!manager.is_started());
    assert_eq!(manager.engine().halt_count(), 1);
}

#[tokio::test]
async fn structural_halt_failure_is_returned_but_still_resets() {
    let engine = ScriptedEngine::new().rejecting_halt(EngineError::engine("halt refused"));
    let manager = create_system_manager(engine, healthy_graph());

    manager.get_system().await.unwrap();
    let err = manager.destroy_system().await.unwrap_err();

    assert_eq!(err, EngineError::Engine("halt refused".into()));
    assert!(!manager.is_started());
    assert!(manager.current_system().is_none());
}

#[tokio::test]
async fn degraded_system_is_halted_on_destroy() {
    let manager = create_system_manager(ScriptedEngine::new(), degraded_graph());

    manager.get_system().await.unwrap();
    manager.destroy_system().await.unwrap();

    assert_eq!(manager.engine().halted(), vec![vec![ResourceId::new("a")]]);
}

#[tokio::test]
async fn separate_managers_are_independent() {
    let first = create_system_manager(ScriptedEngine::new(), healthy_graph());
    let second = create_system_manager(ScriptedEngine::new(), healthy_graph());

    let a = first.get_system().await.unwrap();
    assert!(!second.is_started());

    let b = second.get_system().await.unwrap();
    assert!(!Arc::ptr_eq(&a, &b));

    first.destroy_system().await.unwrap();
    assert!(!first.is_started());
    assert!(second.is_started());
}
