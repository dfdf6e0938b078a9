//! Suspension-compatible accessors for Keystone (Layer 2).
//!
//! `keystone_bridge` exposes a [`SystemManager`](keystone_lifecycle::manager::SystemManager)
//! to a re-render driven consumer tree. Accessors never block: each evaluation
//! returns an [`Access`](access::Access) that is ready, pending on a
//! [`Suspension`](access::Suspension), or failed with a [`Fault`](fault::Fault).
//! The host awaits the suspension and evaluates again.
//!
//! - [`scope`] - Injection scopes that override the managed system for a subtree
//! - [`access`] - The tagged result of an accessor evaluation
//! - [`fault`] - Faults raised to the host's error boundary
//! - [`bridge`] - The primary and resource accessors
//! - [`status`] - The non-suspending status accessor
//! - [`suspense`] - A driver that plays the host's suspense boundary
//!
//! # Example
//!
//! ```ignore
//! use keystone_bridge::prelude::*;
//!
//! let bridge = create_system_bridge(manager);
//! let scope = SystemScope::root();
//!
//! // Suspends until the system is up, then yields the typed resource.
//! let db = suspend_until_ready(|| bridge.use_resource::<Database>(&scope, "db")).await?;
//! ```

/// The tagged result of an accessor evaluation.
pub mod access;

/// The primary and resource accessors.
pub mod bridge;

/// Faults raised to the host's error boundary.
pub mod fault;

/// Injection scopes.
pub mod scope;

/// The non-suspending status accessor.
pub mod status;

/// Suspense boundary driver.
pub mod suspense;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::access::*;
    pub use crate::bridge::*;
    pub use crate::fault::*;
    pub use crate::scope::*;
    pub use crate::status::*;
    pub use crate::suspense::*;
}
