//! Tests for the suspending accessors.
//!
//! Each test drives a `SystemBridge` through a `SuspenseBoundary`, the way a host
//! tree would: evaluate, await the suspension, evaluate again.

use std::sync::Arc;

use keystone_bridge::access::Access;
use keystone_bridge::bridge::{SystemBridge, create_system_bridge};
use keystone_bridge::fault::Fault;
use keystone_bridge::scope::SystemScope;
use keystone_bridge::suspense::{SuspenseBoundary, suspend_until_ready};
use keystone_lifecycle::error::{EngineError, StartupError};
use keystone_lifecycle::manager::create_system_manager;
use keystone_lifecycle::system::StartedSystem;
use keystone_lifecycle::testing::{ScriptedEngine, ScriptedGraph};

fn bridge(graph: ScriptedGraph) -> SystemBridge<ScriptedEngine> {
    create_system_bridge(create_system_manager(ScriptedEngine::new(), graph))
}

fn healthy() -> ScriptedGraph {
    ScriptedGraph::new()
        .with_resource("a", || 1_i32)
        .with_resource("b", || 2_i32)
}

fn degraded() -> ScriptedGraph {
    ScriptedGraph::new()
        .with_resource("a", || 1_i32)
        .with_failure("b", "boom")
}

#[tokio::test]
async fn resource_suspends_then_resolves() {
    let bridge = bridge(healthy());
    let scope = SystemScope::root();
    let mut boundary = SuspenseBoundary::new();

    let a = boundary
        .render(|| bridge.use_resource::<i32>(&scope, "a"))
        .await
        .unwrap();

    assert_eq!(a.as_deref(), Some(&1));
    assert_eq!(boundary.suspensions(), 1);

    // Started now; no further suspension and no second startup.
    let b = boundary
        .render(|| bridge.use_resource::<i32>(&scope, "b"))
        .await
        .unwrap();
    assert_eq!(b.as_deref(), Some(&2));
    assert_eq!(boundary.suspensions(), 1);
    assert_eq!(bridge.manager().engine().start_count(), 1);
}

#[tokio::test]
async fn missing_resource_is_ready_none() {
    let bridge = bridge(healthy());
    let scope = SystemScope::root();

    let missing = suspend_until_ready(|| bridge.use_resource::<i32>(&scope, "zzz"))
        .await
        .unwrap();

    assert!(missing.is_none());
}

#[tokio::test]
async fn degraded_system_suspends_then_faults() {
    let bridge = bridge(degraded());
    let scope = SystemScope::root();
    let mut boundary = SuspenseBoundary::new();

    // "a" started fine, but any failure faults every suspending accessor.
    let fault = boundary
        .render(|| bridge.use_resource::<i32>(&scope, "a"))
        .await
        .unwrap_err();

    assert_eq!(fault.to_string(), "System startup failed: b: boom");
    assert_eq!(fault.failures().map(|failures| failures.len()), Some(1));
    assert_eq!(boundary.suspensions(), 1);
    assert_eq!(boundary.faults(), 1);

    // The fault is stable across evaluations.
    assert!(matches!(
        bridge.use_system(&scope),
        Access::Failed(Fault::StartupFailed { .. })
    ));
    assert_eq!(bridge.manager().engine().start_count(), 1);
}

#[tokio::test]
async fn rejected_startup_faults() {
    let engine = ScriptedEngine::new().rejecting_start(EngineError::invalid_config("cycle"));
    let bridge = create_system_bridge(create_system_manager(engine, healthy()));
    let scope = SystemScope::root();

    let fault = suspend_until_ready(|| bridge.use_system(&scope))
        .await
        .unwrap_err();

    assert!(matches!(
        fault,
        Fault::Startup(StartupError::Engine(EngineError::InvalidConfig(_)))
    ));

    // Memoized until reset: evaluating again faults without restarting.
    assert!(bridge.use_system(&scope).is_failed());
    assert_eq!(bridge.manager().engine().start_count(), 1);
}

#[tokio::test]
async fn injected_system_wins_over_failing_manager() {
    let bridge = bridge(degraded());
    bridge.manager().get_system().await.unwrap();

    let injected = Arc::new(StartedSystem::new().with("a", 42_i32));
    let root = SystemScope::root();
    let scope = bridge.provider(&root, Arc::clone(&injected));
    let nested = scope.child();

    let system = bridge.use_system(&nested).ready().unwrap();
    assert!(Arc::ptr_eq(&system, &injected));

    let a = bridge.use_resource::<i32>(&nested, "a").ready().flatten();
    assert_eq!(a.as_deref(), Some(&42));

    // Outside the provider the manager's failure still applies.
    assert!(bridge.use_system(&root).is_failed());
}

#[tokio::test]
async fn injected_system_never_starts_manager() {
    let bridge = bridge(healthy());
    let scope = SystemScope::with_system(Arc::new(StartedSystem::new()));

    let access = bridge.use_system(&scope);

    assert!(access.is_ready());
    assert!(!bridge.manager().is_starting());
    assert_eq!(bridge.manager().engine().start_count(), 0);
}

#[tokio::test]
async fn destroy_makes_accessors_suspend_again() {
    let bridge = bridge(healthy());
    let scope = SystemScope::root();

    let first = suspend_until_ready(|| bridge.use_system(&scope)).await.unwrap();
    bridge.manager().destroy_system().await.unwrap();

    let access = bridge.use_system(&scope);
    assert!(access.is_pending());

    let second = suspend_until_ready(|| bridge.use_system(&scope)).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(bridge.manager().engine().start_count(), 2);
}

#[tokio::test]
async fn concurrent_consumers_share_one_startup() {
    let bridge = bridge(healthy());

    let consumers = (0..8).map(|_| {
        let bridge = bridge.clone();
        async move {
            let scope = SystemScope::root();
            suspend_until_ready(|| bridge.use_system(&scope)).await
        }
    });
    let systems = futures::future::join_all(consumers).await;

    let first = systems[0].as_ref().unwrap();
    assert!(
        systems
            .iter()
            .all(|system| Arc::ptr_eq(system.as_ref().unwrap(), first))
    );
    assert_eq!(bridge.manager().engine().start_count(), 1);
}

#[test]
fn require_system_without_provider_faults() {
    let root = SystemScope::root();
    let fault = root.child().require_system().unwrap_err();

    assert!(matches!(fault, Fault::MissingProvider));
    assert!(fault.to_string().contains("SystemProvider"));
}
