//! Core infrastructure for Keystone.
//!
//! # Tracing
//!
//! [`TracingSetup`] installs the `tracing` subscriber that renders the structured
//! events emitted by the lifecycle manager and the bridge.
//!
//! ```no_run
//! use keystone_core::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! let config = TracingSetup::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("keystone_lifecycle=debug,keystone_bridge=info")
//!     .init();
//!
//! assert_eq!(config.level, Level::DEBUG);
//! ```

mod tracing_setup;

pub use tracing_setup::{TracingConfig, TracingFormat, TracingSetup};
