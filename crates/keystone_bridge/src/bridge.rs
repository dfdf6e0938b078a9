//! The primary and resource accessors.
//!
//! A [`SystemBridge`] binds one [`SystemManager`] to the consumer tree. Its
//! accessors resolve the system in this order:
//!
//! 1. A system injected through the [`SystemScope`] chain, unconditionally
//! 2. The manager's cached system, if it started without errors
//! 3. A fault listing the per-resource failures, if it started with errors
//! 4. Otherwise the manager's startup: a fault if it was rejected, or a
//!    suspension while it is still running
//!
//! Every evaluation begins from scratch, so a consumer that suspended sees the
//! settled outcome the next time it is evaluated.

use core::any::{Any, type_name};
use core::fmt;
use std::sync::Arc;

use keystone_lifecycle::engine::LifecycleEngine;
use keystone_lifecycle::manager::SystemManager;
use keystone_lifecycle::system::StartedSystem;
use tracing::{debug, trace};

use crate::access::{Access, Suspension};
use crate::fault::Fault;
use crate::scope::SystemScope;
use crate::status::StatusHandle;

/// Accessors over a [`SystemManager`], shaped for re-render driven consumers.
///
/// Cheap to clone; clones observe the same manager.
pub struct SystemBridge<E: LifecycleEngine> {
    manager: SystemManager<E>,
}

impl<E: LifecycleEngine> Clone for SystemBridge<E> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

/// Creates a [`SystemBridge`] over `manager`.
#[must_use]
pub fn create_system_bridge<E: LifecycleEngine>(manager: SystemManager<E>) -> SystemBridge<E> {
    SystemBridge { manager }
}

impl<E: LifecycleEngine> SystemBridge<E> {
    /// Returns the manager this bridge observes.
    #[must_use]
    pub fn manager(&self) -> &SystemManager<E> {
        &self.manager
    }

    /// Creates a scope under `parent` that injects `system` into its subtree.
    ///
    /// Equivalent to [`SystemScope::provide`].
    #[must_use]
    pub fn provider<'parent>(
        &self,
        parent: &'parent SystemScope<'parent>,
        system: Arc<StartedSystem>,
    ) -> SystemScope<'parent> {
        parent.provide(system)
    }

    /// Returns the system visible from `scope`.
    ///
    /// Suspends while the manager is starting, and faults if the startup was
    /// rejected or if any resource failed to start. An injected system is returned
    /// as is, even when the manager has failures.
    pub fn use_system(&self, scope: &SystemScope<'_>) -> Access<Arc<StartedSystem>> {
        if let Some(system) = scope.injected() {
            trace!(manager = %self.manager.name(), "using injected system");
            return Access::Ready(Arc::clone(system));
        }

        if let Some(system) = self.manager.current_system() {
            return self.classify(system);
        }

        let startup = self.manager.get_system();
        match startup.peek() {
            Some(Ok(system)) => self.classify(system),
            Some(Err(err)) => {
                debug!(manager = %self.manager.name(), error = %err, "startup rejected");
                Access::Failed(Fault::Startup(err))
            }
            None => {
                trace!(manager = %self.manager.name(), "suspending until system starts");
                Access::Pending(Suspension::new(startup))
            }
        }
    }

    /// Returns resource `id` of the system visible from `scope`, typed as `T`.
    ///
    /// Follows [`use_system`](Self::use_system) for suspension and faults, so a
    /// failure of any resource faults this accessor too. A missing resource is
    /// `Ready(None)`.
    pub fn use_resource<T: Any + Send + Sync>(
        &self,
        scope: &SystemScope<'_>,
        id: &str,
    ) -> Access<Option<Arc<T>>> {
        self.use_system(scope)
            .and_then(|system| match system.get(id) {
                None => Access::Ready(None),
                Some(instance) => match Arc::clone(instance).downcast::<T>() {
                    Ok(resource) => Access::Ready(Some(resource)),
                    Err(_) => Access::Failed(Fault::TypeMismatch {
                        id: id.into(),
                        expected: type_name::<T>(),
                    }),
                },
            })
    }

    /// Returns a status handle for one consumer.
    ///
    /// The handle never suspends and never faults. Keep it for as long as the
    /// consumer lives; its [`StartTrigger`](crate::status::StartTrigger) stays the
    /// same for that whole time.
    #[must_use]
    pub fn use_system_status(&self, scope: &SystemScope<'_>) -> StatusHandle<E> {
        StatusHandle::new(self.manager.clone(), scope.injected().cloned())
    }

    fn classify(&self, system: Arc<StartedSystem>) -> Access<Arc<StartedSystem>> {
        match self.manager.startup_errors() {
            Some(failures) if !failures.is_empty() => {
                debug!(
                    manager = %self.manager.name(),
                    failed = failures.len(),
                    "faulting on resource failures"
                );
                Access::Failed(Fault::StartupFailed { failures })
            }
            _ => Access::Ready(system),
        }
    }
}

impl<E: LifecycleEngine> fmt::Debug for SystemBridge<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemBridge")
            .field("manager", &self.manager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_lifecycle::error::StartupError;
    use keystone_lifecycle::manager::create_system_manager;
    use keystone_lifecycle::testing::{ScriptedEngine, ScriptedGraph};

    fn bridge() -> SystemBridge<ScriptedEngine> {
        let graph = ScriptedGraph::new().with_resource("a", || 1_i32);
        create_system_bridge(create_system_manager(ScriptedEngine::new(), graph))
    }

    #[test]
    fn injected_system_needs_no_runtime() {
        let bridge = bridge();
        let root = SystemScope::root();
        let scope = bridge.provider(&root, Arc::new(StartedSystem::new().with("a", 7_i32)));

        let a = bridge.use_resource::<i32>(&scope, "a").ready().flatten();
        assert_eq!(a.as_deref(), Some(&7));
        assert_eq!(bridge.manager().engine().start_count(), 0);
    }

    #[test]
    fn no_runtime_faults() {
        let bridge = bridge();
        let access = bridge.use_system(&SystemScope::root());

        assert!(matches!(
            access.fault(),
            Some(Fault::Startup(StartupError::NoRuntime))
        ));
    }

    #[tokio::test]
    async fn type_mismatch_faults() {
        let bridge = bridge();
        let scope = SystemScope::root();
        bridge.manager().get_system().await.unwrap();

        let access = bridge.use_resource::<String>(&scope, "a");
        match access {
            Access::Failed(Fault::TypeMismatch { id, expected }) => {
                assert_eq!(id, "a");
                assert_eq!(expected, type_name::<String>());
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }
}
