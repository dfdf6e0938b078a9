//! Started systems and per-resource error sets.
//!
//! A [`StartedSystem`] maps each [`ResourceId`] to the instance the engine started
//! for it. Resources whose startup failed are simply absent; their failures are
//! collected in an [`ErrorSet`] instead.
//!
//! Both containers preserve insertion order, which is the order the engine
//! reported resources in. Fault messages built from an [`ErrorSet`] list failures
//! in that same order.

use core::any::Any;
use core::fmt;
use std::error::Error;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::id::ResourceId;

/// A type-erased, shared resource instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// StartedSystem
// ─────────────────────────────────────────────────────────────────────────────

/// The started resource graph: resource identifier to started instance.
///
/// Instances are stored type-erased and recovered with [`resource()`](Self::resource).
/// The manager hands out `Arc<StartedSystem>`, so callers that received the same
/// startup hold the very same allocation (`Arc::ptr_eq`).
///
/// # Example
///
/// ```
/// use keystone_lifecycle::system::StartedSystem;
///
/// struct Pool { size: usize }
///
/// let system = StartedSystem::new()
///     .with("pool", Pool { size: 4 })
///     .with("greeting", String::from("hello"));
///
/// assert_eq!(system.resource::<Pool>("pool").map(|p| p.size), Some(4));
/// assert!(system.resource::<Pool>("greeting").is_none());
/// assert!(!system.contains("missing"));
/// ```
#[derive(Clone, Default)]
pub struct StartedSystem {
    resources: IndexMap<ResourceId, Instance>,
}

impl StartedSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: IndexMap::new(),
        }
    }

    /// Builder pattern: inserts an instance and returns self.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, id: impl Into<ResourceId>, instance: T) -> Self {
        self.insert(id, instance);
        self
    }

    /// Inserts a started instance, replacing any previous instance for `id`.
    pub fn insert<T: Any + Send + Sync>(&mut self, id: impl Into<ResourceId>, instance: T) {
        self.resources.insert(id.into(), Arc::new(instance));
    }

    /// Inserts an already shared instance, replacing any previous instance for `id`.
    pub fn insert_shared(&mut self, id: impl Into<ResourceId>, instance: Instance) {
        self.resources.insert(id.into(), instance);
    }

    /// Returns the type-erased instance for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.resources.get(id)
    }

    /// Returns the instance for `id` if it exists and has type `T`.
    #[must_use]
    pub fn resource<T: Any + Send + Sync>(&self, id: &str) -> Option<Arc<T>> {
        self.resources
            .get(id)
            .and_then(|instance| Arc::clone(instance).downcast::<T>().ok())
    }

    /// Returns true if an instance was started for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Returns the number of started resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resource was started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over started resource identifiers in engine order.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.resources.keys()
    }

    /// Iterates over `(id, instance)` pairs in engine order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Instance)> {
        self.resources.iter()
    }
}

impl fmt::Debug for StartedSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartedSystem")
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceError
// ─────────────────────────────────────────────────────────────────────────────

/// The failure of a single resource during startup or halt.
///
/// Cheap to clone; the original error, when there is one, is kept behind an `Arc`
/// and exposed through [`Error::source`].
#[derive(Clone)]
pub struct ResourceError {
    message: String,
    source: Option<Arc<dyn Error + Send + Sync>>,
}

impl ResourceError {
    /// Creates a `ResourceError` from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a `ResourceError` that wraps an underlying error.
    ///
    /// The message is the underlying error's `Display` output.
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self {
            message: error.to_string(),
            source: Some(Arc::new(error)),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ErrorSet
// ─────────────────────────────────────────────────────────────────────────────

/// Per-resource failures collected by the engine, keyed by resource identifier.
///
/// An empty set after a completed startup means every resource started.
#[derive(Debug, Clone, Default)]
pub struct ErrorSet {
    errors: IndexMap<ResourceId, ResourceError>,
}

impl ErrorSet {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            errors: IndexMap::new(),
        }
    }

    /// Builder pattern: records a failure and returns self.
    #[must_use]
    pub fn with(mut self, id: impl Into<ResourceId>, error: ResourceError) -> Self {
        self.insert(id, error);
        self
    }

    /// Records the failure of `id`, replacing any earlier failure for it.
    pub fn insert(&mut self, id: impl Into<ResourceId>, error: ResourceError) {
        self.errors.insert(id.into(), error);
    }

    /// Returns the failure recorded for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceError> {
        self.errors.get(id)
    }

    /// Returns true if a failure was recorded for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.errors.contains_key(id)
    }

    /// Returns the number of failed resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no resource failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over failed resource identifiers in the order they were recorded.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.errors.keys()
    }

    /// Iterates over `(id, error)` pairs in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &ResourceError)> {
        self.errors.iter()
    }

    /// Renders the failures as comma-joined `id: message` pairs.
    ///
    /// ```
    /// use keystone_lifecycle::system::{ErrorSet, ResourceError};
    ///
    /// let errors = ErrorSet::new()
    ///     .with("b", ResourceError::new("boom"))
    ///     .with("c", ResourceError::new("timeout"));
    ///
    /// assert_eq!(errors.summary(), "b: boom, c: timeout");
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(id, error)| format!("{id}: {error}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
