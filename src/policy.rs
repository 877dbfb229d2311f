//! Recovery policies: what to do after a failed attempt.
//!
//! After every failed attempt the fetcher asks its [`RecoveryPolicy`] whether
//! to issue another attempt or give up. The attempt index passed to the
//! policy is 0-based: the first failure is reported as attempt `0`.

use crate::FetchError;

/// The outcome of consulting a recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Issue another attempt.
    Retry,
    /// Stop and surface the error.
    Propagate,
}

/// Decides whether a failed attempt should be retried.
///
/// Policies may have side effects (refreshing a token before allowing the
/// retry, for instance) but must not block.
///
/// # Examples
///
/// ```
/// use jsonfetch::{FetchError, RecoveryPolicy, RetryDecision};
///
/// struct RetryOnRateLimit;
///
/// impl RecoveryPolicy for RetryOnRateLimit {
///     fn decide(&self, error: &FetchError, attempt: usize) -> RetryDecision {
///         match error {
///             FetchError::BadStatusCode { status, .. }
///                 if status.as_u16() == 429 && attempt < 5 => RetryDecision::Retry,
///             _ => RetryDecision::Propagate,
///         }
///     }
/// }
/// ```
pub trait RecoveryPolicy: Send + Sync {
    /// Decides what to do about `error`, raised by the attempt with 0-based
    /// index `attempt`.
    fn decide(&self, error: &FetchError, attempt: usize) -> RetryDecision;
}

/// Retries any failure until `max_retries` retries have been spent.
///
/// With `max_retries = 3` a fetch makes at most 4 attempts. This is the
/// fetcher's default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    /// The maximum number of retries after the first attempt.
    pub max_retries: usize,
}

impl BoundedRetry {
    /// The number of retries used when nothing else is configured.
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// Creates a policy allowing `max_retries` retries.
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }
}

impl Default for BoundedRetry {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES)
    }
}

impl RecoveryPolicy for BoundedRetry {
    fn decide(&self, _error: &FetchError, attempt: usize) -> RetryDecision {
        if attempt >= self.max_retries {
            RetryDecision::Propagate
        } else {
            RetryDecision::Retry
        }
    }
}

/// Like [`BoundedRetry`], but only for errors where
/// [`FetchError::is_retryable`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientOnly {
    /// The maximum number of retries after the first attempt.
    pub max_retries: usize,
}

impl TransientOnly {
    /// Creates a policy allowing `max_retries` retries of transient errors.
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries }
    }
}

impl RecoveryPolicy for TransientOnly {
    fn decide(&self, error: &FetchError, attempt: usize) -> RetryDecision {
        if error.is_retryable() {
            BoundedRetry::new(self.max_retries).decide(error, attempt)
        } else {
            RetryDecision::Propagate
        }
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RecoveryPolicy for NeverRetry {
    fn decide(&self, _error: &FetchError, _attempt: usize) -> RetryDecision {
        RetryDecision::Propagate
    }
}

/// A policy built from a closure. See [`from_fn`].
#[derive(Clone, Copy)]
pub struct PolicyFn<F> {
    f: F,
}

/// Builds a policy from a closure.
///
/// # Examples
///
/// Special-case one error kind without touching the fetch loop:
///
/// ```
/// use jsonfetch::policy::{self, BoundedRetry, RecoveryPolicy, RetryDecision};
/// use jsonfetch::FetchError;
///
/// let bounded = BoundedRetry::new(3);
/// let policy = policy::from_fn(move |error: &FetchError, attempt| match error.status() {
///     Some(status) if status.as_u16() == 401 => {
///         // refresh credentials here, then try again once
///         if attempt == 0 { RetryDecision::Retry } else { RetryDecision::Propagate }
///     }
///     _ => bounded.decide(error, attempt),
/// });
/// ```
pub fn from_fn<F>(f: F) -> PolicyFn<F>
where
    F: Fn(&FetchError, usize) -> RetryDecision + Send + Sync,
{
    PolicyFn { f }
}

impl<F> RecoveryPolicy for PolicyFn<F>
where
    F: Fn(&FetchError, usize) -> RetryDecision + Send + Sync,
{
    fn decide(&self, error: &FetchError, attempt: usize) -> RetryDecision {
        (self.f)(error, attempt)
    }
}

impl<F> std::fmt::Debug for PolicyFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyFn").finish_non_exhaustive()
    }
}
