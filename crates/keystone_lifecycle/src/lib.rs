//! The singleton lifecycle manager for Keystone (Layer 1).
//!
//! `keystone_lifecycle` wraps an external, dependency-ordered resource engine and
//! presents a resource graph as one idempotent, observable asynchronous resource:
//!
//! - [`engine`] - The [`LifecycleEngine`](engine::LifecycleEngine) seam to the external engine
//! - [`id`] - Resource identifiers
//! - [`system`] - Started systems and per-resource error sets
//! - [`manager`] - The [`SystemManager`](manager::SystemManager) and its startup handles
//! - [`error`] - Structural engine and startup errors
//! - `testing` - A scripted in-memory engine for tests (`test-utils` feature)
//!
//! # Features
//!
//! - `test-utils` - Enables the `testing` module for downstream test suites
//!
//! # Architecture
//!
//! - **Layer 1** (`keystone_lifecycle`): at-most-once startup, caching, reset (this crate)
//! - **Layer 2** (`keystone_bridge`): accessors for re-render driven consumers
//!
//! # Example
//!
//! ```ignore
//! use keystone_lifecycle::manager::create_system_manager;
//!
//! let manager = create_system_manager(MyEngine::default(), my_config);
//!
//! // Any number of concurrent callers share one startup.
//! let system = manager.get_system().await?;
//! let db = system.resource::<Database>("db");
//!
//! // Halt and reset so the next `get_system()` starts fresh.
//! manager.destroy_system().await?;
//! ```

/// The seam to the external lifecycle engine.
pub mod engine;

/// Structural engine and startup errors.
pub mod error;

/// Resource identifiers.
pub mod id;

/// The singleton lifecycle manager.
pub mod manager;

/// Started systems and per-resource error sets.
pub mod system;

/// A scripted in-memory engine for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::error::*;
    pub use crate::id::*;
    pub use crate::manager::*;
    pub use crate::system::*;
}
