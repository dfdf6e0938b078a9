//! Error types for the lifecycle manager.
//!
//! Per-resource failures are not errors at this level: the engine collects them in
//! an [`ErrorSet`](crate::system::ErrorSet) and the manager degrades gracefully. The
//! types here cover failures of the engine call as a whole.

/// A structural failure reported by the engine itself.
///
/// Returned when the engine rejects a call outright (for example a malformed
/// configuration), as opposed to individual resources failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The resource graph configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Any other engine-level failure.
    #[error("engine error: {0}")]
    Engine(String),
}

impl EngineError {
    /// Creates an [`InvalidConfig`](Self::InvalidConfig).
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Creates an [`Engine`](Self::Engine).
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

/// Why a [`Startup`](crate::manager::Startup) failed to produce a system.
///
/// Cloneable because one startup result is shared by every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    /// The engine rejected the startup call.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The startup task panicked or was cancelled by runtime shutdown.
    #[error("startup task aborted: {0}")]
    Aborted(String),

    /// No tokio runtime was available to drive the startup.
    #[error("no async runtime available to start the system")]
    NoRuntime,
}
