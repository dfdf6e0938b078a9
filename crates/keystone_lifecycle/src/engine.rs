//! The seam to the external lifecycle engine.
//!
//! Keystone does not resolve dependencies or order startup itself. An engine
//! implementing [`LifecycleEngine`] does that work and reports the outcome; the
//! manager only decides when the engine runs and caches what it returns.
//!
//! # Contract
//!
//! - [`start_system`](LifecycleEngine::start_system) starts resources in dependency
//!   order. It must not fail because an individual resource failed; those failures go
//!   in [`StartOutcome::errors`] and the resource is left out of the system.
//! - [`halt_system`](LifecycleEngine::halt_system) halts in reverse dependency order
//!   and collects per-resource halt failures the same way.
//! - Either call may return an [`EngineError`] for structural problems.
//!
//! # Example
//!
//! ```
//! use keystone_lifecycle::engine::{BoxFuture, HaltOutcome, LifecycleEngine, StartOutcome};
//! use keystone_lifecycle::error::EngineError;
//! use keystone_lifecycle::system::{ErrorSet, StartedSystem};
//!
//! struct Fixed;
//!
//! impl LifecycleEngine for Fixed {
//!     type Config = Vec<(&'static str, i32)>;
//!
//!     fn start_system<'a>(
//!         &'a self,
//!         config: &'a Self::Config,
//!     ) -> BoxFuture<'a, Result<StartOutcome, EngineError>> {
//!         Box::pin(async move {
//!             let mut system = StartedSystem::new();
//!             for (id, value) in config {
//!                 system.insert(*id, *value);
//!             }
//!             Ok(StartOutcome::new(system, ErrorSet::new()))
//!         })
//!     }
//!
//!     fn halt_system<'a>(
//!         &'a self,
//!         _config: &'a Self::Config,
//!         _system: &'a StartedSystem,
//!     ) -> BoxFuture<'a, Result<HaltOutcome, EngineError>> {
//!         Box::pin(async { Ok(HaltOutcome::default()) })
//!     }
//! }
//! ```

use core::future::Future;
use core::pin::Pin;

use crate::error::EngineError;
use crate::system::{ErrorSet, StartedSystem};

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The result of a completed startup: the (possibly partial) system and the
/// failures of resources that did not start.
#[derive(Debug, Clone, Default)]
pub struct StartOutcome {
    /// Instances of every resource that started.
    pub system: StartedSystem,
    /// Failures of every resource that did not start.
    pub errors: ErrorSet,
}

impl StartOutcome {
    /// Creates a `StartOutcome`.
    #[must_use]
    pub fn new(system: StartedSystem, errors: ErrorSet) -> Self {
        Self { system, errors }
    }
}

/// The result of a completed halt.
#[derive(Debug, Clone, Default)]
pub struct HaltOutcome {
    /// Failures of resources that did not halt cleanly.
    pub errors: ErrorSet,
}

impl HaltOutcome {
    /// Creates a `HaltOutcome`.
    #[must_use]
    pub fn new(errors: ErrorSet) -> Self {
        Self { errors }
    }
}

/// An external engine that starts and halts a resource graph.
pub trait LifecycleEngine: Send + Sync + 'static {
    /// The resource graph configuration this engine understands.
    ///
    /// Opaque to Keystone; it is stored by the manager and handed back to the
    /// engine unchanged.
    type Config: Send + Sync + 'static;

    /// Starts every resource in `config`, in dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only for structural failures. Individual resource
    /// failures belong in [`StartOutcome::errors`].
    fn start_system<'a>(
        &'a self,
        config: &'a Self::Config,
    ) -> BoxFuture<'a, Result<StartOutcome, EngineError>>;

    /// Halts every resource of `system`, in reverse dependency order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] only for structural failures. Individual halt
    /// failures belong in [`HaltOutcome::errors`].
    fn halt_system<'a>(
        &'a self,
        config: &'a Self::Config,
        system: &'a StartedSystem,
    ) -> BoxFuture<'a, Result<HaltOutcome, EngineError>>;
}
