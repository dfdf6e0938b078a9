//! Suspense boundary driver.
//!
//! Hosts without their own suspense mechanism can drive an accessor to completion
//! with [`suspend_until_ready`], or keep a [`SuspenseBoundary`] to count how often
//! their consumers suspended and faulted.

use tracing::trace;

use crate::access::Access;
use crate::fault::Fault;

/// Evaluates `evaluate` until it is ready or faults, awaiting every suspension.
///
/// # Errors
///
/// Returns the [`Fault`] of the first evaluation that failed.
///
/// # Example
///
/// ```ignore
/// let scope = SystemScope::root();
/// let system = suspend_until_ready(|| bridge.use_system(&scope)).await?;
/// ```
pub async fn suspend_until_ready<T, F>(evaluate: F) -> Result<T, Fault>
where
    F: FnMut() -> Access<T>,
{
    SuspenseBoundary::new().render(evaluate).await
}

/// A stand-in for a host's suspense and error boundary.
#[derive(Debug, Default)]
pub struct SuspenseBoundary {
    suspensions: usize,
    faults: usize,
}

impl SuspenseBoundary {
    /// Creates a boundary with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders one consumer: evaluates until ready or faulted.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] of the first evaluation that failed.
    pub async fn render<T, F>(&mut self, mut evaluate: F) -> Result<T, Fault>
    where
        F: FnMut() -> Access<T>,
    {
        loop {
            match evaluate() {
                Access::Ready(value) => return Ok(value),
                Access::Failed(fault) => {
                    self.faults += 1;
                    trace!(error = %fault, "boundary caught fault");
                    return Err(fault);
                }
                Access::Pending(suspension) => {
                    self.suspensions += 1;
                    trace!(suspensions = self.suspensions, "consumer suspended");
                    suspension.await;
                }
            }
        }
    }

    /// Returns how many times a consumer suspended in this boundary.
    #[must_use]
    pub fn suspensions(&self) -> usize {
        self.suspensions
    }

    /// Returns how many faults this boundary caught.
    #[must_use]
    pub fn faults(&self) -> usize {
        self.faults
    }
}
