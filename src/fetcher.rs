//! The retrying JSON fetcher.
//!
//! [`Fetcher`] is the main entry point. Configure it with [`FetcherBuilder`].

use crate::{
    decode::{decode_response, Decoded},
    Backoff, BoundedRetry, FetchConfig, FetchError, JsonObject, RecoveryPolicy, Request,
    Response, Result, RetryDecision, Transport, TransportError,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Fetches JSON objects through a [`Transport`], retrying failed attempts as
/// its [`RecoveryPolicy`] allows.
///
/// The fetcher holds no per-fetch state; every call keeps its own attempt
/// counter, so one fetcher can serve any number of concurrent fetches.
/// Cloning is cheap.
///
/// # Examples
///
/// ```no_run
/// use jsonfetch::{Backoff, Fetcher, Request, ReqwestTransport};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), jsonfetch::FetchError> {
/// let fetcher = Fetcher::builder(ReqwestTransport::new())
///     .max_retries(3)
///     .attempt_timeout(Duration::from_secs(10))
///     .backoff(Backoff::Exponential {
///         initial_delay: Duration::from_millis(100),
///         max_delay: Duration::from_secs(5),
///         jitter: true,
///     })
///     .build()?;
///
/// let request = Request::builder(http::Method::POST, "http://api.mysite.com/test")?
///     .header("Authentication", "token")?
///     .build();
///
/// let object = fetcher.fetch(&request).await?;
/// println!("{:?}", object.get("name"));
/// # Ok(())
/// # }
/// ```
pub struct Fetcher<T> {
    inner: Arc<FetcherInner<T>>,
}

struct FetcherInner<T> {
    transport: T,
    policy: Box<dyn RecoveryPolicy>,
    backoff: Backoff,
    attempt_timeout: Option<Duration>,
}

impl<T> Clone for Fetcher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Fetcher<T> {
    /// Creates a `FetcherBuilder` around `transport`.
    pub fn builder(transport: T) -> FetcherBuilder<T> {
        FetcherBuilder::new(transport)
    }

    /// Creates a fetcher with the default policy (3 retries, no backoff, no
    /// timeout).
    pub fn new(transport: T) -> Self {
        Self::from_parts(
            transport,
            Box::new(BoundedRetry::default()),
            Backoff::Immediate,
            None,
        )
    }

    fn from_parts(
        transport: T,
        policy: Box<dyn RecoveryPolicy>,
        backoff: Backoff,
        attempt_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                transport,
                policy,
                backoff,
                attempt_timeout,
            }),
        }
    }

    /// The transport this fetcher sends through.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Fetches `request` and decodes the payload as a top-level JSON object.
    ///
    /// Resolves exactly once: with the object, or with the error the recovery
    /// policy chose to surface, wrapped in [`FetchError::RetriesExhausted`].
    pub async fn fetch(&self, request: &Request) -> Result<JsonObject> {
        self.fetch_as(request).await
    }

    /// Fetches `request` and converts the top-level JSON object into `Res`.
    ///
    /// A payload that is not an object, or an object that does not fit `Res`,
    /// is a [`FetchError::DecodeFailure`] and goes through the recovery policy
    /// like any other failed attempt.
    pub async fn fetch_as<Res>(&self, request: &Request) -> Result<Res>
    where
        Res: DeserializeOwned,
    {
        Ok(self.fetch_response(request).await?.data)
    }

    /// Like [`fetch_as`](Self::fetch_as), keeping status, headers, raw body,
    /// latency and attempt count.
    pub async fn fetch_response<Res>(&self, request: &Request) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.execute(request, &CancellationToken::new()).await
    }

    /// Fetches `request` until it succeeds, the policy gives up, or `cancel`
    /// is cancelled.
    ///
    /// The token is checked right before every attempt is issued and raced
    /// against both the in-flight attempt and the backoff wait. Once it is
    /// cancelled no further attempt starts and the fetch resolves with
    /// [`FetchError::Cancelled`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jsonfetch::{Fetcher, JsonObject, Request, ReqwestTransport};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// # async fn example() -> Result<(), jsonfetch::FetchError> {
    /// let fetcher = Fetcher::new(ReqwestTransport::new());
    /// let request = Request::get("https://api.example.com/slow")?;
    /// let cancel = CancellationToken::new();
    ///
    /// let handle = {
    ///     let cancel = cancel.clone();
    ///     tokio::spawn(async move {
    ///         fetcher.fetch_with_cancel::<JsonObject>(&request, &cancel).await
    ///     })
    /// };
    ///
    /// cancel.cancel();
    /// let _ = handle.await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_with_cancel<Res>(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.execute(request, cancel).await
    }

    /// Fetches two requests concurrently and returns both results.
    ///
    /// Each side is an independent retrying fetch. The pair is returned only
    /// if both succeed; the first failure is returned and the other fetch is
    /// dropped, cancelling its in-flight attempt.
    pub async fn fetch_pair<A, B>(&self, first: &Request, second: &Request) -> Result<(A, B)>
    where
        A: DeserializeOwned,
        B: DeserializeOwned,
    {
        tokio::try_join!(self.fetch_as::<A>(first), self.fetch_as::<B>(second))
    }

    /// The retry loop shared by every public entry point.
    async fn execute<Res>(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let start_time = Instant::now();
        // Failed attempts so far; also the 0-based index of the next one.
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(request, attempt));
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(request, attempt)),
                result = self.attempt::<Res>(request, attempt) => result,
            };

            let error = match result {
                Ok(decoded) => {
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = decoded.status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt + 1,
                        "Received JSON response"
                    );

                    return Ok(Response::new(
                        decoded.data,
                        decoded.body,
                        decoded.status,
                        decoded.headers,
                        latency,
                        attempt + 1,
                    ));
                }
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %request.method(),
                url = %request.url(),
                "Fetch attempt failed"
            );

            if self.inner.policy.decide(&error, attempt) == RetryDecision::Propagate {
                return Err(FetchError::RetriesExhausted {
                    attempts: attempt + 1,
                    last_error: Box::new(error),
                });
            }

            attempt += 1;
            let delay = self.inner.backoff.delay_for_retry(attempt);

            tracing::info!(
                delay_ms = delay.as_millis(),
                attempt = attempt,
                "Retrying request after delay"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(request, attempt)),
                _ = pause(delay) => {}
            }
        }
    }

    /// Runs one transport exchange and validates its output.
    async fn attempt<Res>(&self, request: &Request, attempt: usize) -> Result<Decoded<Res>>
    where
        Res: DeserializeOwned,
    {
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            attempt = attempt,
            "Executing HTTP request"
        );

        let send = self.inner.transport.send(request);
        let raw = match self.inner.attempt_timeout {
            Some(timeout) => tokio::time::timeout(timeout, send)
                .await
                .map_err(|_| TransportError::Timeout(timeout))??,
            None => send.await?,
        };

        decode_response(raw)
    }

    fn cancelled(&self, request: &Request, attempts: usize) -> FetchError {
        tracing::info!(
            failed_attempts = attempts,
            url = %request.url(),
            "Fetch cancelled"
        );
        FetchError::Cancelled { attempts }
    }
}

/// Waits before the next attempt. A zero delay still yields to the runtime so
/// cancellation and outer deadlines get a chance to run.
async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

/// Builder for configuring and creating a [`Fetcher`].
///
/// # Examples
///
/// ```no_run
/// use jsonfetch::{policy, FetchError, FetcherBuilder, ReqwestTransport, RetryDecision};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), FetchError> {
/// let fetcher = FetcherBuilder::new(ReqwestTransport::new())
///     .attempt_timeout(Duration::from_secs(30))
///     .recovery_policy(policy::from_fn(|error: &FetchError, attempt| {
///         if error.is_retryable() && attempt < 5 {
///             RetryDecision::Retry
///         } else {
///             RetryDecision::Propagate
///         }
///     }))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FetcherBuilder<T> {
    transport: T,
    policy: Option<Box<dyn RecoveryPolicy>>,
    max_retries: usize,
    backoff: Backoff,
    attempt_timeout: Option<Duration>,
}

impl<T: Transport> FetcherBuilder<T> {
    /// Creates a builder with default settings.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: None,
            max_retries: BoundedRetry::DEFAULT_MAX_RETRIES,
            backoff: Backoff::Immediate,
            attempt_timeout: None,
        }
    }

    /// Sets the retry budget of the default [`BoundedRetry`] policy.
    ///
    /// Ignored when a custom policy is set with
    /// [`recovery_policy`](Self::recovery_policy).
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replaces the default policy.
    pub fn recovery_policy(mut self, policy: impl RecoveryPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Sets the delay schedule between attempts.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets a timeout applied to each attempt separately.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Applies every setting from `config`.
    pub fn config(mut self, config: FetchConfig) -> Self {
        self.max_retries = config.max_retries;
        self.backoff = config.backoff;
        self.attempt_timeout = config.attempt_timeout;
        self
    }

    /// Builds the configured `Fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Configuration`] for a zero attempt timeout or an
    /// exponential backoff whose initial delay exceeds its maximum.
    pub fn build(self) -> Result<Fetcher<T>> {
        FetchConfig {
            max_retries: self.max_retries,
            attempt_timeout: self.attempt_timeout,
            backoff: self.backoff.clone(),
        }
        .validate()?;

        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(BoundedRetry::new(self.max_retries)));

        Ok(Fetcher::from_parts(
            self.transport,
            policy,
            self.backoff,
            self.attempt_timeout,
        ))
    }
}
