//! # Keystone Internal Library
//!
//! Re-exports the core Keystone crates for convenience.

/// Layer 1: Singleton lifecycle manager.
pub use keystone_lifecycle;

/// Layer 2: Suspension-compatible accessors.
pub use keystone_bridge;

/// Core infrastructure (tracing).
pub use keystone_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use keystone_bridge::prelude::*;
    pub use keystone_core::{TracingConfig, TracingFormat, TracingSetup};
    pub use keystone_lifecycle::prelude::*;
}
