//! The tagged result of an accessor evaluation.
//!
//! Accessors are synchronous. When the value they read is not available yet they
//! return [`Access::Pending`] with a [`Suspension`] instead of blocking. The host
//! awaits the suspension and then evaluates the accessor again from scratch;
//! nothing is carried across the suspend/resume cycle except the manager's cache.
//!
//! ```text
//!   evaluate ──► Ready(T) ─────────────► render
//!      ▲    ├──► Failed(Fault) ────────► error boundary
//!      │    └──► Pending(Suspension)
//!      │                │ .await
//!      └────────────────┘
//! ```

use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use keystone_lifecycle::manager::Startup;

use crate::fault::Fault;

/// The outcome of evaluating an accessor once.
#[must_use]
#[derive(Debug)]
pub enum Access<T> {
    /// The value is available.
    Ready(T),
    /// The value is not available yet; await the suspension and evaluate again.
    Pending(Suspension),
    /// The evaluation failed; the fault belongs to an error boundary.
    Failed(Fault),
}

impl<T> Access<T> {
    /// Returns true if the value is available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Returns true if the evaluation suspended.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns true if the evaluation faulted.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the value, discarding a suspension or fault.
    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) | Self::Failed(_) => None,
        }
    }

    /// Returns the fault, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Failed(fault) => Some(fault),
            Self::Ready(_) | Self::Pending(_) => None,
        }
    }

    /// Returns the suspension, if any.
    #[must_use]
    pub fn suspension(self) -> Option<Suspension> {
        match self {
            Self::Pending(suspension) => Some(suspension),
            Self::Ready(_) | Self::Failed(_) => None,
        }
    }

    /// Maps a ready value, leaving suspensions and faults untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Access<U> {
        match self {
            Self::Ready(value) => Access::Ready(f(value)),
            Self::Pending(suspension) => Access::Pending(suspension),
            Self::Failed(fault) => Access::Failed(fault),
        }
    }

    /// Chains another evaluation onto a ready value.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Access<U>) -> Access<U> {
        match self {
            Self::Ready(value) => f(value),
            Self::Pending(suspension) => Access::Pending(suspension),
            Self::Failed(fault) => Access::Failed(fault),
        }
    }
}

impl<T> From<Result<T, Fault>> for Access<T> {
    fn from(result: Result<T, Fault>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(fault) => Self::Failed(fault),
        }
    }
}

/// A readiness token for a suspended evaluation.
///
/// Resolves once the startup it waits on settles, whatever the outcome. The
/// outcome itself is read by evaluating the accessor again. Dropping a suspension
/// never cancels the startup.
#[must_use = "a suspension does nothing unless awaited"]
#[derive(Clone)]
pub struct Suspension {
    startup: Startup,
}

impl Suspension {
    pub(crate) fn new(startup: Startup) -> Self {
        Self { startup }
    }

    /// Returns true if awaiting this suspension would complete immediately.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.startup.is_settled()
    }

    /// Returns the startup this suspension waits on.
    #[must_use]
    pub fn startup(&self) -> &Startup {
        &self.startup
    }
}

impl Future for Suspension {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.get_mut().startup).poll(cx).map(|_| ())
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("settled", &self.is_settled())
            .finish()
    }
}
