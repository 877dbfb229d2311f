//! # jsonfetch - a retrying async JSON fetcher
//!
//! `jsonfetch` issues an HTTP request through an injected [`Transport`],
//! validates the response into a top-level JSON object, and retries failed
//! attempts under a pluggable [`RecoveryPolicy`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use jsonfetch::{Fetcher, Request, ReqwestTransport};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsonfetch::FetchError> {
//!     // Default policy: up to 3 retries, so at most 4 attempts
//!     let fetcher = Fetcher::new(ReqwestTransport::new());
//!
//!     let request = Request::builder(Method::POST, "http://api.mysite.com/test")?
//!         .header("Authentication", "token")?
//!         .build();
//!
//!     let json = fetcher.fetch(&request).await?;
//!     println!("Response: {:?}", json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## What counts as a failed attempt
//!
//! Each attempt is checked in order, and the first failing check decides the
//! error:
//!
//! 1. the transport failed or timed out - [`FetchError::TransportFailure`]
//! 2. no HTTP response metadata - [`FetchError::InvalidResponse`]
//! 3. status outside 200–299 - [`FetchError::BadStatusCode`]
//! 4. missing or empty payload - [`FetchError::BadData`]
//! 5. payload is not a top-level JSON object - [`FetchError::DecodeFailure`]
//!
//! Every failure goes to the recovery policy together with the 0-based attempt
//! index. When the policy answers [`RetryDecision::Propagate`], the fetch
//! resolves with [`FetchError::RetriesExhausted`] wrapping the last error.
//!
//! ## Custom recovery
//!
//! ```no_run
//! use jsonfetch::{policy, FetchError, Fetcher, ReqwestTransport, RetryDecision};
//! use http::StatusCode;
//!
//! # fn example() -> Result<(), FetchError> {
//! let fetcher = Fetcher::builder(ReqwestTransport::new())
//!     .recovery_policy(policy::from_fn(|error: &FetchError, attempt| {
//!         match error.status() {
//!             Some(StatusCode::UNAUTHORIZED) if attempt == 0 => {
//!                 // re-authenticate, then try once more
//!                 RetryDecision::Retry
//!             }
//!             _ if attempt < 3 => RetryDecision::Retry,
//!             _ => RetryDecision::Propagate,
//!         }
//!     }))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Dropping a fetch future drops its in-flight attempt and no further attempt
//! is issued. [`Fetcher::fetch_with_cancel`] takes a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) for callers that
//! need to cancel from elsewhere.

mod backoff;
mod config;
mod decode;
mod error;
mod fetcher;
mod request;
mod response;
mod transport;

pub mod policy;

pub use backoff::Backoff;
pub use config::FetchConfig;
pub use error::{FetchError, FetchErrorKind, Result, TransportError};
pub use fetcher::{Fetcher, FetcherBuilder};
pub use policy::{BoundedRetry, RecoveryPolicy, RetryDecision};
pub use request::{Request, RequestBuilder};
pub use response::{JsonObject, RawResponse, Response, ResponseMeta};
pub use transport::{ReqwestTransport, Transport};
