//! Keystone runs a dependency-ordered resource graph once and shares it.
//!
//! A [`SystemManager`](keystone_lifecycle::manager::SystemManager) starts the graph
//! at most once however many callers ask for it, caches the started system, and
//! halts it on demand. A [`SystemBridge`](keystone_bridge::bridge::SystemBridge)
//! exposes that system to re-render driven consumers through accessors that
//! suspend while it starts and fault when it fails.
//!
//! ```ignore
//! use keystone::prelude::*;
//!
//! let manager = create_system_manager(engine, config);
//! let bridge = create_system_bridge(manager.clone());
//! let scope = SystemScope::root();
//!
//! let db = suspend_until_ready(|| bridge.use_resource::<Database>(&scope, "db")).await?;
//! manager.destroy_system().await?;
//! ```

pub use keystone_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use keystone_internal::prelude::*;
}
