//! The singleton lifecycle manager.
//!
//! A [`SystemManager`] turns a resource graph configuration into one shared,
//! idempotent asynchronous resource. However many callers ask for the system, and
//! however they interleave, the engine is started at most once per cycle and every
//! caller receives the same `Arc<StartedSystem>`.
//!
//! # Lifecycle
//!
//! ```text
//!          get_system()              engine returns
//!   Idle ────────────────► Starting ────────────────► Started (system + errors)
//!    ▲                         │                          │
//!    │                         │ engine fails             │
//!    │                         ▼                          │
//!    │                     Rejected                       │
//!    │                         │                          │
//!    └──── destroy_system() ◄──┴──────────────────────────┘
//! ```
//!
//! - **Idle** - nothing cached, nothing in flight
//! - **Starting** - one startup task is running; callers join it
//! - **Started** - the system is cached, possibly with per-resource errors
//! - **Rejected** - the engine call itself failed; the failure is memoized
//!
//! [`destroy_system()`](SystemManager::destroy_system) halts a started system and
//! returns the manager to **Idle**.
//!
//! # No Cancellation
//!
//! Startup runs on a spawned tokio task. Dropping every [`Startup`] handle does not
//! stop it; the outcome is still cached for later callers.

use core::any::Any;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::engine::{BoxFuture, LifecycleEngine, StartOutcome};
use crate::error::{EngineError, StartupError};
use crate::system::{ErrorSet, StartedSystem};

/// The value every [`Startup`] resolves to.
pub type StartupResult = Result<Arc<StartedSystem>, StartupError>;

type SharedStartup = Shared<BoxFuture<'static, StartupResult>>;

// ─────────────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────────────

/// A handle to one startup of a [`SystemManager`].
///
/// `Startup` is a cloneable future. All handles returned for the same startup
/// resolve to the same `Arc<StartedSystem>` (or the same error). Handles returned
/// after the system is cached are already settled.
///
/// Per-resource failures do not make a `Startup` fail; inspect
/// [`SystemManager::startup_errors()`] for those.
#[derive(Clone)]
pub struct Startup {
    inner: StartupInner,
}

#[derive(Clone)]
enum StartupInner {
    /// The outcome was known when the handle was created.
    Settled(StartupResult),
    /// The outcome is produced by the shared startup task.
    Pending(SharedStartup),
}

impl Startup {
    fn settled(result: StartupResult) -> Self {
        Self {
            inner: StartupInner::Settled(result),
        }
    }

    fn pending(future: impl Future<Output = StartupResult> + Send + 'static) -> Self {
        Self {
            inner: StartupInner::Pending(future.boxed().shared()),
        }
    }

    /// Returns the outcome if this startup has settled and been observed.
    ///
    /// A pending handle reports its outcome once any clone of it has been polled
    /// to completion.
    #[must_use]
    pub fn peek(&self) -> Option<StartupResult> {
        match &self.inner {
            StartupInner::Settled(result) => Some(result.clone()),
            StartupInner::Pending(shared) => shared.peek().cloned(),
        }
    }

    /// Returns true if [`peek()`](Self::peek) would return an outcome.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        match &self.inner {
            StartupInner::Settled(_) => true,
            StartupInner::Pending(shared) => shared.peek().is_some(),
        }
    }

    /// Returns true if both handles belong to the same startup.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (StartupInner::Pending(a), StartupInner::Pending(b)) => a.ptr_eq(b),
            (StartupInner::Settled(Ok(a)), StartupInner::Settled(Ok(b))) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Future for Startup {
    type Output = StartupResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            StartupInner::Settled(result) => Poll::Ready(result.clone()),
            StartupInner::Pending(shared) => shared.poll_unpin(cx),
        }
    }
}

impl fmt::Debug for Startup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Startup")
            .field("settled", &self.is_settled())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SystemManager
// ─────────────────────────────────────────────────────────────────────────────

/// Manages the single shared startup of a resource graph.
///
/// `SystemManager` is a cheap handle: clones share the same state. Two managers
/// built separately never share anything, even when built from equal configs.
///
/// # Example
///
/// ```ignore
/// let manager = create_system_manager(engine, config);
///
/// // Both callers join the same startup; the engine runs once.
/// let (a, b) = tokio::join!(manager.get_system(), manager.get_system());
/// assert!(Arc::ptr_eq(&a?, &b?));
///
/// assert!(manager.is_started());
/// manager.destroy_system().await?;
/// assert!(!manager.is_started());
/// ```
pub struct SystemManager<E: LifecycleEngine> {
    inner: Arc<ManagerInner<E>>,
}

struct ManagerInner<E: LifecycleEngine> {
    /// Label used in log output.
    name: String,
    engine: E,
    config: E::Config,
    /// Cache and in-flight state. Never held across an `.await`.
    state: Mutex<ManagerState>,
    /// Serializes `destroy_system()` calls.
    teardown: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct ManagerState {
    /// The in-flight startup, if any.
    pending: Option<Startup>,
    /// The last completed system.
    system: Option<Arc<StartedSystem>>,
    /// Per-resource failures of the last completed startup.
    errors: Option<Arc<ErrorSet>>,
    /// Memoized structural failure of the last startup.
    rejection: Option<StartupError>,
    /// Bumped on every reset; a startup from an older generation never writes.
    generation: u64,
}

impl<E: LifecycleEngine> Clone for SystemManager<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Creates a [`SystemManager`] for `config`, driven by `engine`.
///
/// Shorthand for `SystemManager::builder(engine, config).build()`.
#[must_use]
pub fn create_system_manager<E: LifecycleEngine>(engine: E, config: E::Config) -> SystemManager<E> {
    SystemManager::builder(engine, config).build()
}

impl<E: LifecycleEngine> SystemManager<E> {
    /// Returns a builder for a manager of `config`, driven by `engine`.
    #[must_use]
    pub fn builder(engine: E, config: E::Config) -> ManagerBuilder<E> {
        ManagerBuilder {
            engine,
            config,
            name: None,
        }
    }

    /// Returns the system, starting it if needed.
    ///
    /// - If a system is cached, returns an already settled handle to it.
    /// - If a startup is in flight, returns a handle to that startup.
    /// - Otherwise spawns exactly one startup on the current tokio runtime.
    ///
    /// The check and the spawn happen under one lock with no suspension point in
    /// between, so concurrent callers can never start the engine twice.
    ///
    /// Per-resource failures are recorded (see [`startup_errors()`](Self::startup_errors))
    /// and logged, but the handle still resolves to the partial system. The handle
    /// fails only if the engine call itself fails, or if no runtime is available.
    pub fn get_system(&self) -> Startup {
        let mut state = self.inner.state.lock();

        if let Some(system) = &state.system {
            return Startup::settled(Ok(Arc::clone(system)));
        }
        if let Some(rejection) = &state.rejection {
            return Startup::settled(Err(rejection.clone()));
        }
        if let Some(pending) = &state.pending {
            return pending.clone();
        }

        let Ok(runtime) = Handle::try_current() else {
            error!(
                manager = %self.inner.name,
                "get_system() called outside of a tokio runtime"
            );
            return Startup::settled(Err(StartupError::NoRuntime));
        };

        let startup = self.spawn_startup(&runtime, state.generation);
        state.pending = Some(startup.clone());
        startup
    }

    /// Halts the started system and resets the manager.
    ///
    /// Waits for an in-flight startup to settle first, so a system that is still
    /// starting is halted rather than leaked. Then, if a system is cached, the
    /// engine halts it with the original config. Finally every cached and pending
    /// value is cleared under one lock, and the next [`get_system()`](Self::get_system)
    /// performs a fresh startup.
    ///
    /// Per-resource halt failures are logged and do not fail this call. Calling
    /// this when nothing was started is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the engine's [`EngineError`] if the halt call itself failed. The
    /// manager is reset even in that case.
    pub async fn destroy_system(&self) -> Result<(), EngineError> {
        let _teardown = self.inner.teardown.lock().await;

        let system = loop {
            let pending = {
                let mut state = self.inner.state.lock();
                if let Some(pending) = state.pending.clone() {
                    pending
                } else if let Some(system) = state.system.clone() {
                    break system;
                } else {
                    // Nothing to halt; reset before releasing the lock.
                    self.inner.reset_locked(&mut state);
                    return Ok(());
                }
            };

            debug!(manager = %self.inner.name, "waiting for in-flight startup before teardown");
            if let Err(err) = pending.await {
                debug!(manager = %self.inner.name, error = %err, "in-flight startup failed");
            }
        };

        let result = self.inner.halt(&system).await;
        self.inner.reset();
        result
    }

    /// Returns the cached system without starting anything.
    #[must_use]
    pub fn current_system(&self) -> Option<Arc<StartedSystem>> {
        self.inner.state.lock().system.clone()
    }

    /// Returns the per-resource failures of the last completed startup.
    ///
    /// `None` until a startup completes; an empty set if everything started.
    #[must_use]
    pub fn startup_errors(&self) -> Option<Arc<ErrorSet>> {
        self.inner.state.lock().errors.clone()
    }

    /// Returns true if a startup has completed and its system is cached.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().system.is_some()
    }

    /// Returns the structural failure of the last startup, if it was rejected.
    ///
    /// The failure stays memoized until [`destroy_system()`](Self::destroy_system).
    #[must_use]
    pub fn startup_failure(&self) -> Option<StartupError> {
        self.inner.state.lock().rejection.clone()
    }

    /// Returns the number of resets this manager has gone through.
    ///
    /// Every [`destroy_system()`](Self::destroy_system) starts a new cycle, so two
    /// observations with the same cycle refer to the same startup.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.inner.state.lock().generation
    }

    /// Returns true while a startup is in flight.
    #[must_use]
    pub fn is_starting(&self) -> bool {
        self.inner
            .state
            .lock()
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.is_settled())
    }

    /// Returns the manager's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the resource graph configuration.
    #[must_use]
    pub fn config(&self) -> &E::Config {
        &self.inner.config
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// Returns true if both handles refer to the same manager.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn spawn_startup(&self, runtime: &Handle, generation: u64) -> Startup {
        debug!(manager = %self.inner.name, generation, "starting system");

        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move {
            match AssertUnwindSafe(inner.run_startup(generation))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => inner.record_abort(generation, panic_message(payload.as_ref())),
            }
        });

        let weak: Weak<ManagerInner<E>> = Arc::downgrade(&self.inner);
        Startup::pending(async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => match weak.upgrade() {
                    Some(inner) => inner.record_abort(generation, join_error.to_string()),
                    None => Err(StartupError::Aborted(join_error.to_string())),
                },
            }
        })
    }
}

impl<E: LifecycleEngine> fmt::Debug for SystemManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SystemManager")
            .field("name", &self.inner.name)
            .field("started", &state.system.is_some())
            .field("pending", &state.pending.is_some())
            .field("rejected", &state.rejection.is_some())
            .finish()
    }
}

impl<E: LifecycleEngine> ManagerInner<E> {
    /// Runs the engine and records the outcome if no reset happened meanwhile.
    async fn run_startup(&self, generation: u64) -> StartupResult {
        let outcome = self.engine.start_system(&self.config).await;

        match outcome {
            Ok(StartOutcome { system, errors }) => {
                let system = Arc::new(system);
                if errors.is_empty() {
                    info!(
                        manager = %self.name,
                        resources = system.len(),
                        "system started"
                    );
                } else {
                    warn!(
                        manager = %self.name,
                        resources = system.len(),
                        failed = errors.len(),
                        errors = %errors.summary(),
                        "system started with resource failures"
                    );
                }

                let mut state = self.state.lock();
                if state.generation == generation {
                    state.system = Some(Arc::clone(&system));
                    state.errors = Some(Arc::new(errors));
                    state.pending = None;
                }
                Ok(system)
            }
            Err(err) => {
                error!(manager = %self.name, error = %err, "system startup failed");
                let err = StartupError::from(err);

                let mut state = self.state.lock();
                if state.generation == generation {
                    state.rejection = Some(err.clone());
                    state.pending = None;
                }
                Err(err)
            }
        }
    }

    /// Memoizes an aborted startup so waiters and peeks see it settle.
    fn record_abort(&self, generation: u64, reason: String) -> StartupResult {
        error!(manager = %self.name, reason = %reason, "system startup aborted");
        let err = StartupError::Aborted(reason);

        let mut state = self.state.lock();
        if state.generation == generation && state.system.is_none() {
            state.rejection = Some(err.clone());
            state.pending = None;
        }
        Err(err)
    }

    async fn halt(&self, system: &StartedSystem) -> Result<(), EngineError> {
        debug!(manager = %self.name, resources = system.len(), "halting system");

        let outcome = match self.engine.halt_system(&self.config, system).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(manager = %self.name, error = %err, "system halt failed");
                return Err(err);
            }
        };

        if outcome.errors.is_empty() {
            info!(manager = %self.name, "system halted");
        } else {
            warn!(
                manager = %self.name,
                failed = outcome.errors.len(),
                errors = %outcome.errors.summary(),
                "system halted with resource failures"
            );
        }
        Ok(())
    }

    /// Clears every cached and pending value and starts a new generation.
    fn reset(&self) {
        self.reset_locked(&mut self.state.lock());
    }

    fn reset_locked(&self, state: &mut ManagerState) {
        let generation = state.generation.wrapping_add(1);
        *state = ManagerState {
            generation,
            ..ManagerState::default()
        };
        debug!(manager = %self.name, generation, "system reset");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("engine panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("engine panicked: {message}")
    } else {
        "engine panicked".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ManagerBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`SystemManager`].
///
/// # Example
///
/// ```ignore
/// let manager = SystemManager::builder(engine, config)
///     .with_name("checkout")
///     .build();
/// assert_eq!(manager.name(), "checkout");
/// ```
pub struct ManagerBuilder<E: LifecycleEngine> {
    engine: E,
    config: E::Config,
    name: Option<String>,
}

impl<E: LifecycleEngine> ManagerBuilder<E> {
    /// Sets the name used in log output. Defaults to `"system"`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the manager. Nothing is started until the first
    /// [`get_system()`](SystemManager::get_system).
    #[must_use]
    pub fn build(self) -> SystemManager<E> {
        SystemManager {
            inner: Arc::new(ManagerInner {
                name: self.name.unwrap_or_else(|| "system".to_string()),
                engine: self.engine,
                config: self.config,
                state: Mutex::new(ManagerState::default()),
                teardown: tokio::sync::Mutex::new(()),
            }),
        }
    }
}
