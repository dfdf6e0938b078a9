//! The non-suspending status accessor.
//!
//! Consumers that render their own loading and error states use a
//! [`StatusHandle`] instead of the suspending accessors. A handle belongs to one
//! consumer for its whole life. It keeps a local phase, reconciled against the
//! manager every time a [`SystemStatus`] snapshot is taken.
//!
//! ```text
//!                 fire()                settled
//!   Idle ─────────────────► Loading ──────────────► Ready | Failed
//!    ▲  │                                                │
//!    │  └── fire() when already started ──► Ready        │
//!    │                                                   │
//!    └──────────────── destroy_system() ◄────────────────┘
//! ```
//!
//! Starting is always explicit: a handle never starts the system on its own.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use keystone_lifecycle::engine::LifecycleEngine;
use keystone_lifecycle::error::StartupError;
use keystone_lifecycle::manager::{Startup, StartupResult, SystemManager};
use keystone_lifecycle::system::{ErrorSet, StartedSystem};
use parking_lot::Mutex;
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// SystemStatus
// ─────────────────────────────────────────────────────────────────────────────

/// Where a consumer's view of the system stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPhase {
    /// Nothing has been started from this consumer's point of view.
    #[default]
    Idle,
    /// A startup is in flight.
    Loading,
    /// The system started with no resource failures, or was injected.
    Ready,
    /// The startup was rejected or some resources failed.
    Failed,
}

/// A snapshot of a [`StatusHandle`].
///
/// Exactly one of the four flags is set.
#[derive(Debug, Clone)]
pub struct SystemStatus {
    /// The phase the flags are derived from.
    pub phase: StatusPhase,
    /// No startup requested yet.
    pub is_idle: bool,
    /// Startup in flight.
    pub is_loading: bool,
    /// System available.
    pub is_ready: bool,
    /// Startup rejected or degraded.
    pub is_failed: bool,
    /// The observed system, possibly partial.
    pub system: Option<Arc<StartedSystem>>,
    /// Per-resource failures of the observed startup.
    pub errors: Option<Arc<ErrorSet>>,
    /// Why the startup was rejected, if it was.
    pub fault: Option<StartupError>,
}

impl SystemStatus {
    fn new(
        phase: StatusPhase,
        system: Option<Arc<StartedSystem>>,
        errors: Option<Arc<ErrorSet>>,
        fault: Option<StartupError>,
    ) -> Self {
        Self {
            phase,
            is_idle: phase == StatusPhase::Idle,
            is_loading: phase == StatusPhase::Loading,
            is_ready: phase == StatusPhase::Ready,
            is_failed: phase == StatusPhase::Failed,
            system,
            errors,
            fault,
        }
    }

    /// Looks up resource `id` in the observed system.
    ///
    /// Never faults: failed, missing and mistyped resources are all `None`.
    #[must_use]
    pub fn resource<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.system.as_ref()?.resource::<T>(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StartTrigger
// ─────────────────────────────────────────────────────────────────────────────

/// Requests a startup on behalf of one consumer.
///
/// A handle returns the same trigger every time it is asked, so hosts that compare
/// callbacks by identity see a stable value. Use [`ptr_eq`](Self::ptr_eq) to check.
#[derive(Clone)]
pub struct StartTrigger {
    action: Arc<dyn Fn() + Send + Sync>,
}

impl StartTrigger {
    fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            action: Arc::new(action),
        }
    }

    fn noop() -> Self {
        Self::new(|| {})
    }

    /// Requests a startup. Returns without waiting for it.
    pub fn fire(&self) {
        (self.action)();
    }

    /// Returns true if both triggers are the same trigger.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.action, &other.action)
    }
}

impl fmt::Debug for StartTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartTrigger").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StatusHandle
// ─────────────────────────────────────────────────────────────────────────────

/// The status accessor state of one consumer.
///
/// Created by [`SystemBridge::use_system_status`](crate::bridge::SystemBridge::use_system_status).
/// Clones share the same local state and trigger.
pub struct StatusHandle<E: LifecycleEngine> {
    manager: SystemManager<E>,
    injected: Option<Arc<StartedSystem>>,
    local: Arc<Mutex<LocalStatus>>,
    trigger: StartTrigger,
}

/// The consumer's own view, reconciled against the manager on every read.
#[derive(Default)]
struct LocalStatus {
    phase: StatusPhase,
    system: Option<Arc<StartedSystem>>,
    errors: Option<Arc<ErrorSet>>,
    fault: Option<StartupError>,
    /// The startup this consumer is waiting on while loading.
    pending: Option<Startup>,
    /// The manager cycle the phase was observed in.
    cycle: u64,
}

impl LocalStatus {
    /// Seeds a fresh view from whatever the manager holds right now.
    fn observe<E: LifecycleEngine>(manager: &SystemManager<E>) -> Self {
        match manager.current_system() {
            Some(system) => Self {
                phase: StatusPhase::Ready,
                system: Some(system),
                errors: manager.startup_errors(),
                cycle: manager.cycle(),
                ..Self::default()
            },
            None => Self {
                cycle: manager.cycle(),
                ..Self::default()
            },
        }
    }

    fn settle<E: LifecycleEngine>(&mut self, manager: &SystemManager<E>, outcome: StartupResult) {
        self.pending = None;
        match outcome {
            Ok(system) => {
                let errors = manager.startup_errors();
                let degraded = errors.as_ref().is_some_and(|errors| !errors.is_empty());
                self.phase = if degraded {
                    StatusPhase::Failed
                } else {
                    StatusPhase::Ready
                };
                self.system = Some(system);
                self.errors = errors;
                self.fault = None;
            }
            Err(err) => {
                self.phase = StatusPhase::Failed;
                self.system = None;
                self.errors = None;
                self.fault = Some(err);
            }
        }
        debug!(manager = %manager.name(), phase = ?self.phase, "status settled");
    }

    fn reconcile<E: LifecycleEngine>(&mut self, manager: &SystemManager<E>) {
        if self.phase == StatusPhase::Idle {
            return;
        }
        if manager.cycle() != self.cycle {
            debug!(manager = %manager.name(), "observed system was destroyed");
            *self = Self {
                cycle: manager.cycle(),
                ..Self::default()
            };
            return;
        }
        if self.phase != StatusPhase::Loading {
            return;
        }

        let outcome = self
            .pending
            .as_ref()
            .and_then(Startup::peek)
            .or_else(|| manager.current_system().map(Ok))
            .or_else(|| manager.startup_failure().map(Err));
        if let Some(outcome) = outcome {
            self.settle(manager, outcome);
        }
    }

    fn start<E: LifecycleEngine>(&mut self, manager: &SystemManager<E>) {
        self.reconcile(manager);
        if matches!(self.phase, StatusPhase::Loading | StatusPhase::Ready) {
            return;
        }

        // Ready even when degraded, matching the seeded phase.
        if manager.is_started() {
            *self = Self::observe(manager);
            return;
        }

        let startup = manager.get_system();
        *self = Self {
            phase: StatusPhase::Loading,
            pending: Some(startup),
            cycle: manager.cycle(),
            ..Self::default()
        };
        self.reconcile(manager);
    }
}

impl<E: LifecycleEngine> StatusHandle<E> {
    pub(crate) fn new(manager: SystemManager<E>, injected: Option<Arc<StartedSystem>>) -> Self {
        let local = Arc::new(Mutex::new(LocalStatus::observe(&manager)));

        let trigger = if injected.is_some() {
            StartTrigger::noop()
        } else {
            let manager = manager.clone();
            let local = Arc::clone(&local);
            StartTrigger::new(move || local.lock().start(&manager))
        };

        Self {
            manager,
            injected,
            local,
            trigger,
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        if let Some(system) = &self.injected {
            return SystemStatus::new(StatusPhase::Ready, Some(Arc::clone(system)), None, None);
        }

        let mut local = self.local.lock();
        local.reconcile(&self.manager);
        SystemStatus::new(
            local.phase,
            local.system.clone(),
            local.errors.clone(),
            local.fault.clone(),
        )
    }

    /// Returns this consumer's start trigger.
    ///
    /// Always the same trigger for the same handle. With an injected system the
    /// trigger does nothing.
    #[must_use]
    pub fn start_system(&self) -> StartTrigger {
        self.trigger.clone()
    }

    /// Waits until a startup requested by this consumer settles.
    ///
    /// Returns the resulting status right away if nothing is loading.
    pub async fn settled(&self) -> SystemStatus {
        let pending = self.local.lock().pending.clone();
        if let Some(startup) = pending {
            // The outcome is read back through the reconciled status.
            startup.await.ok();
        }
        self.status()
    }
}

impl<E: LifecycleEngine> Clone for StatusHandle<E> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            injected: self.injected.clone(),
            local: Arc::clone(&self.local),
            trigger: self.trigger.clone(),
        }
    }
}

impl<E: LifecycleEngine> fmt::Debug for StatusHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusHandle")
            .field("manager", &self.manager.name())
            .field("injected", &self.injected.is_some())
            .field("phase", &self.local.lock().phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_lifecycle::manager::create_system_manager;
    use keystone_lifecycle::testing::{ScriptedEngine, ScriptedGraph};

    fn manager() -> SystemManager<ScriptedEngine> {
        let graph = ScriptedGraph::new().with_resource("a", || 1_i32);
        create_system_manager(ScriptedEngine::new(), graph)
    }

    #[test]
    fn snapshot_flags_are_exclusive() {
        for phase in [
            StatusPhase::Idle,
            StatusPhase::Loading,
            StatusPhase::Ready,
            StatusPhase::Failed,
        ] {
            let status = SystemStatus::new(phase, None, None, None);
            let set = [status.is_idle, status.is_loading, status.is_ready, status.is_failed];
            assert_eq!(set.iter().filter(|flag| **flag).count(), 1);
        }
    }

    #[test]
    fn injected_status_is_ready_with_noop_trigger() {
        let system = Arc::new(StartedSystem::new().with("a", 5_i32));
        let handle = StatusHandle::new(manager(), Some(Arc::clone(&system)));

        handle.start_system().fire();
        let status = handle.status();

        assert!(status.is_ready);
        assert!(Arc::ptr_eq(status.system.as_ref().unwrap(), &system));
        assert_eq!(status.resource::<i32>("a").as_deref(), Some(&5));
        assert_eq!(handle.manager.engine().start_count(), 0);
    }

    #[test]
    fn trigger_without_runtime_fails() {
        let handle = StatusHandle::new(manager(), None);
        assert!(handle.status().is_idle);

        handle.start_system().fire();
        let status = handle.status();

        assert!(status.is_failed);
        assert_eq!(status.fault, Some(StartupError::NoRuntime));
    }

    #[test]
    fn trigger_is_stable() {
        let handle = StatusHandle::new(manager(), None);
        let first = handle.start_system();
        handle.status();
        assert!(first.ptr_eq(&handle.start_system()));
        assert!(first.ptr_eq(&handle.clone().start_system()));
    }
}
