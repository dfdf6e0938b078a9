//! A scripted, in-memory engine for tests.
//!
//! [`ScriptedEngine`] stands in for a real lifecycle engine when testing code that
//! consumes a [`SystemManager`](crate::manager::SystemManager). Each resource of a
//! [`ScriptedGraph`] either builds a fresh instance or fails with a fixed message,
//! and the engine counts how often it was asked to start and halt.
//!
//! # Example
//!
//! ```
//! use keystone_lifecycle::manager::create_system_manager;
//! use keystone_lifecycle::testing::{ScriptedEngine, ScriptedGraph};
//!
//! # tokio_test::block_on(async {
//! let graph = ScriptedGraph::new()
//!     .with_resource("a", || 1_i32)
//!     .with_failure("b", "boom");
//!
//! let manager = create_system_manager(ScriptedEngine::new(), graph);
//! let system = manager.get_system().await.unwrap();
//!
//! assert_eq!(system.resource::<i32>("a").as_deref(), Some(&1));
//! assert!(!system.contains("b"));
//! assert_eq!(manager.startup_errors().unwrap().summary(), "b: boom");
//! assert_eq!(manager.engine().start_count(), 1);
//! # });
//! ```

use core::any::Any;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::engine::{BoxFuture, HaltOutcome, LifecycleEngine, StartOutcome};
use crate::error::EngineError;
use crate::id::ResourceId;
use crate::system::{ErrorSet, Instance, ResourceError, StartedSystem};

type Factory = Arc<dyn Fn() -> Result<Instance, ResourceError> + Send + Sync>;

/// An ordered list of scripted resources, used as the [`ScriptedEngine`] config.
#[derive(Clone, Default)]
pub struct ScriptedGraph {
    resources: Vec<(ResourceId, Factory)>,
}

impl ScriptedGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource that starts by calling `factory`.
    ///
    /// The factory runs on every startup, so each startup gets fresh instances.
    #[must_use]
    pub fn with_resource<T, F>(mut self, id: impl Into<ResourceId>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Ok(Arc::new(factory()) as Instance));
        self.resources.push((id.into(), factory));
        self
    }

    /// Adds a resource whose startup always fails with `message`.
    #[must_use]
    pub fn with_failure(mut self, id: impl Into<ResourceId>, message: impl Into<String>) -> Self {
        let message = message.into();
        let factory: Factory = Arc::new(move || Err(ResourceError::new(message.clone())));
        self.resources.push((id.into(), factory));
        self
    }

    /// Returns the number of scripted resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the graph has no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// An engine that plays back a [`ScriptedGraph`].
///
/// Resources start in graph order and halt in reverse order. Optional knobs make
/// the engine wait on a gate before finishing a startup, reject or panic on calls,
/// or report per-resource halt failures.
#[derive(Default)]
pub struct ScriptedEngine {
    starts: AtomicUsize,
    halts: AtomicUsize,
    gate: Option<Arc<Notify>>,
    start_rejection: Option<EngineError>,
    start_panic: Option<&'static str>,
    halt_rejection: Option<EngineError>,
    halt_failures: ErrorSet,
    halted: Mutex<Vec<Vec<ResourceId>>>,
}

impl ScriptedEngine {
    /// Creates an engine with no knobs set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every startup wait for one permit from `gate` before completing.
    ///
    /// The start is counted before waiting, so tests can observe an in-flight
    /// startup and then release it with [`Notify::notify_one`].
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Makes every startup fail structurally with `error`.
    #[must_use]
    pub fn rejecting_start(mut self, error: EngineError) -> Self {
        self.start_rejection = Some(error);
        self
    }

    /// Makes every startup panic with `message` after it is counted.
    #[must_use]
    pub fn panicking_start(mut self, message: &'static str) -> Self {
        self.start_panic = Some(message);
        self
    }

    /// Makes every halt fail structurally with `error`.
    #[must_use]
    pub fn rejecting_halt(mut self, error: EngineError) -> Self {
        self.halt_rejection = Some(error);
        self
    }

    /// Reports a per-resource halt failure for `id` on every halt.
    #[must_use]
    pub fn with_halt_failure(mut self, id: impl Into<ResourceId>, message: impl Into<String>) -> Self {
        self.halt_failures.insert(id, ResourceError::new(message));
        self
    }

    /// Returns how many times a startup was requested.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Returns how many times a halt was requested.
    #[must_use]
    pub fn halt_count(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    /// Returns the resources of every halt, each listed in halt order.
    #[must_use]
    pub fn halted(&self) -> Vec<Vec<ResourceId>> {
        self.halted.lock().clone()
    }
}

impl LifecycleEngine for ScriptedEngine {
    type Config = ScriptedGraph;

    fn start_system<'a>(
        &'a self,
        config: &'a Self::Config,
    ) -> BoxFuture<'a, Result<StartOutcome, EngineError>> {
        Box::pin(async move {
            self.starts.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(message) = self.start_panic {
                panic!("{message}");
            }
            if let Some(error) = &self.start_rejection {
                return Err(error.clone());
            }

            let mut outcome = StartOutcome::default();
            for (id, factory) in &config.resources {
                match factory() {
                    Ok(instance) => outcome.system.insert_shared(id.clone(), instance),
                    Err(error) => outcome.errors.insert(id.clone(), error),
                }
            }
            Ok(outcome)
        })
    }

    fn halt_system<'a>(
        &'a self,
        _config: &'a Self::Config,
        system: &'a StartedSystem,
    ) -> BoxFuture<'a, Result<HaltOutcome, EngineError>> {
        Box::pin(async move {
            self.halts.fetch_add(1, Ordering::SeqCst);

            if let Some(error) = &self.halt_rejection {
                return Err(error.clone());
            }

            let mut order: Vec<ResourceId> = system.ids().cloned().collect();
            order.reverse();
            self.halted.lock().push(order);
            Ok(HaltOutcome::new(self.halt_failures.clone()))
        })
    }
}
