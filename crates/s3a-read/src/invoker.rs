//! Execution of remote calls under a retry policy.
//!
//! An [`Invoker`] is shared by every stream opened from the same store
//! session. It decides whether a failed call is attempted again; it does
//! not sleep between attempts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::TRACING_TARGET_INVOKER;
use crate::error::{Error, Result};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Attempt the call again.
    Retry,
    /// Give up and return the error.
    Fail,
}

/// Decides whether a failed call should be retried.
pub trait RetryPolicy: fmt::Debug + Send + Sync {
    /// `retries` is the number of retries already made for this call.
    fn should_retry(&self, error: &Error, retries: u32, idempotent: bool) -> RetryAction;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetries;

impl RetryPolicy for NoRetries {
    fn should_retry(&self, _error: &Error, _retries: u32, _idempotent: bool) -> RetryAction {
        RetryAction::Fail
    }
}

/// Retries retryable failures of idempotent calls up to `limit` times.
#[derive(Debug, Clone, Copy)]
pub struct MaxRetries {
    limit: u32,
}

impl MaxRetries {
    /// Creates a policy allowing at most `limit` retries per call.
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    /// Maximum number of retries per call.
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for MaxRetries {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy for MaxRetries {
    fn should_retry(&self, error: &Error, retries: u32, idempotent: bool) -> RetryAction {
        if idempotent && error.is_retryable() && retries < self.limit {
            RetryAction::Retry
        } else {
            RetryAction::Fail
        }
    }
}

/// Runs store operations, retrying according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Invoker {
    policy: Arc<dyn RetryPolicy>,
}

impl Invoker {
    /// Creates an invoker using `policy`.
    pub fn new(policy: impl RetryPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// An invoker that never retries.
    pub fn no_retries() -> Self {
        Self::new(NoRetries)
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &dyn RetryPolicy {
        self.policy.as_ref()
    }

    /// Runs `operation` exactly once.
    #[tracing::instrument(name = "invoker.once", skip(self, operation))]
    pub async fn once<T, F, Fut>(&self, action: &str, path: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        operation().await
    }

    /// Runs `operation`, retrying failures the policy accepts.
    ///
    /// The last error is returned once the policy gives up.
    #[tracing::instrument(name = "invoker.retry", skip(self, operation))]
    pub async fn retry<T, F, Fut>(
        &self,
        action: &str,
        path: &str,
        idempotent: bool,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            match self.policy.should_retry(&err, retries, idempotent) {
                RetryAction::Retry => {
                    retries += 1;
                    tracing::warn!(
                        target: TRACING_TARGET_INVOKER,
                        action,
                        path,
                        retries,
                        error = %err,
                        "retrying store operation"
                    );
                }
                RetryAction::Fail => {
                    if retries > 0 {
                        tracing::debug!(
                            target: TRACING_TARGET_INVOKER,
                            action,
                            path,
                            retries,
                            "giving up on store operation"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(MaxRetries::default())
    }
}
