//! Faults raised by accessors.
//!
//! A [`Fault`] is what the host's error boundary receives. Unlike a pending
//! evaluation, a fault is terminal for the current manager cycle: evaluating the
//! accessor again yields the same fault until the system is destroyed.

use std::sync::Arc;

use keystone_lifecycle::error::StartupError;
use keystone_lifecycle::id::ResourceId;
use keystone_lifecycle::system::ErrorSet;

/// Errors surfaced to a consumer's error boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Fault {
    /// The system started, but at least one resource failed.
    ///
    /// Any failure faults every suspending accessor, including accessors for
    /// resources that did start.
    #[error("System startup failed: {}", .failures.summary())]
    StartupFailed {
        /// Per-resource failures in startup order.
        failures: Arc<ErrorSet>,
    },

    /// The startup itself was rejected.
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// A resource exists but holds a different type than requested.
    #[error("resource '{id}' is not a `{expected}`")]
    TypeMismatch {
        /// The resource that was looked up.
        id: ResourceId,
        /// The requested type name.
        expected: &'static str,
    },

    /// No system was provided to the scope and no manager is available.
    #[error("no system in scope: wrap the consumer in a SystemProvider (`SystemScope::provide`)")]
    MissingProvider,
}

impl Fault {
    /// Returns the per-resource failures if this is a [`Fault::StartupFailed`].
    #[must_use]
    pub fn failures(&self) -> Option<&ErrorSet> {
        match self {
            Self::StartupFailed { failures } => Some(failures),
            _ => None,
        }
    }
}
