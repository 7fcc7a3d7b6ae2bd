//! Per-call deadline and cancellation for driver operations.
//!
//! Every driver primitive takes an [`OpContext`]. Callers that need neither a
//! deadline nor cooperative shutdown use [`OpContext::default`], which never
//! fires; servers typically derive one context per request and share its
//! token across the request's driver calls.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::driver::{DriverError, Result};

/// Caller-scoped cancellation token plus an optional per-call deadline.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
    deadline: Option<Duration>,
}

impl OpContext {
    /// Creates a context with no deadline and a fresh, never-fired token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this context with the given per-call deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns a copy of this context bound to the given cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The cancellation token driver calls race against.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The per-call deadline, if one is set.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Runs one driver operation under this context.
    ///
    /// The operation is raced against the cancellation token and, when set,
    /// the deadline. Dropping the in-flight future releases the operation's
    /// sockets and file handles promptly.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Cancelled`] or [`DriverError::DeadlineExceeded`]
    /// when the corresponding signal wins the race, otherwise the operation's
    /// own result.
    pub async fn run<T>(
        &self,
        method: &'static str,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.cancel.cancelled() => Err(DriverError::Cancelled { method }),
                    outcome = tokio::time::timeout(deadline, operation) => match outcome {
                        Ok(result) => result,
                        Err(_) => Err(DriverError::DeadlineExceeded { method }),
                    },
                }
            },
            None => {
                tokio::select! {
                    () = self.cancel.cancelled() => Err(DriverError::Cancelled { method }),
                    result = operation => result,
                }
            },
        }
    }
}
