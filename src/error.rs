//! Error types for JSON fetches.
//!
//! Every failure a fetch can produce is a [`FetchError`]. Failures of a single
//! attempt (bad status, bad payload, transport trouble) are routed through the
//! recovery policy first; construction errors (bad URL, bad header, bad
//! configuration) are returned synchronously and never reach the transport.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// The main error type for JSON fetches.
///
/// # Examples
///
/// ```no_run
/// use jsonfetch::{FetchError, Fetcher, Request, ReqwestTransport};
///
/// # async fn example() -> Result<(), FetchError> {
/// let fetcher = Fetcher::builder(ReqwestTransport::new()).build()?;
/// let request = Request::get("https://api.example.com/test")?;
///
/// match fetcher.fetch(&request).await {
///     Ok(object) => println!("Got {} keys", object.len()),
///     Err(FetchError::RetriesExhausted { attempts, last_error }) => {
///         eprintln!("Gave up after {} attempts: {}", attempts, last_error);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// The response carried no usable metadata, or the metadata did not come
    /// from an HTTP exchange.
    #[error("Invalid response: no HTTP response metadata")]
    InvalidResponse,

    /// The server answered with a status outside 200–299.
    #[error("Bad status code {status}: {raw_response}")]
    BadStatusCode {
        /// The HTTP status code
        status: StatusCode,
        /// The response headers
        headers: HeaderMap,
        /// The response body, lossily decoded as UTF-8
        raw_response: String,
    },

    /// A successful status with a missing or empty payload.
    #[error("Bad data: empty payload (status {status})")]
    BadData {
        /// The HTTP status code
        status: StatusCode,
    },

    /// The payload was not a top-level JSON object, or the object could not
    /// be converted into the requested type.
    #[error("Failed to decode JSON object (status {status}): {serde_error}")]
    DecodeFailure {
        /// The HTTP status code
        status: StatusCode,
        /// The response body, lossily decoded as UTF-8
        raw_response: String,
        /// What went wrong while decoding
        serde_error: String,
    },

    /// The transport failed before a response was produced.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// The recovery policy decided to stop retrying.
    ///
    /// `attempts` counts every transport exchange issued for the fetch.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        last_error: Box<FetchError>,
    },

    /// The fetch was cancelled through its cancellation token.
    #[error("Fetch cancelled after {attempts} failed attempts")]
    Cancelled {
        /// The number of attempts that failed before cancellation was observed
        attempts: usize,
    },

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid request or fetcher configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Field-less mirror of [`FetchError`], handy for matching in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Missing or non-HTTP response metadata.
    InvalidResponse,
    /// Status outside 200–299.
    BadStatusCode,
    /// Successful status with an empty payload.
    BadData,
    /// Payload was not a usable JSON object.
    DecodeFailure,
    /// The transport failed before a response arrived.
    TransportFailure,
    /// The recovery policy stopped retrying.
    RetriesExhausted,
    /// The fetch was cancelled.
    Cancelled,
    /// The URL could not be parsed.
    InvalidUrl,
    /// Invalid request or fetcher configuration.
    Configuration,
}

impl FetchError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidResponse => FetchErrorKind::InvalidResponse,
            FetchError::BadStatusCode { .. } => FetchErrorKind::BadStatusCode,
            FetchError::BadData { .. } => FetchErrorKind::BadData,
            FetchError::DecodeFailure { .. } => FetchErrorKind::DecodeFailure,
            FetchError::TransportFailure(_) => FetchErrorKind::TransportFailure,
            FetchError::RetriesExhausted { .. } => FetchErrorKind::RetriesExhausted,
            FetchError::Cancelled { .. } => FetchErrorKind::Cancelled,
            FetchError::InvalidUrl(_) => FetchErrorKind::InvalidUrl,
            FetchError::Configuration(_) => FetchErrorKind::Configuration,
        }
    }

    /// Returns `true` if this error is likely transient.
    ///
    /// Transport failures, invalid responses, 5xx and 429 statuses are
    /// transient. Client errors and payload problems are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsonfetch::FetchError;
    /// use http::{HeaderMap, StatusCode};
    ///
    /// let err = FetchError::BadStatusCode {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     headers: HeaderMap::new(),
    ///     raw_response: String::new(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = FetchError::BadStatusCode {
    ///     status: StatusCode::NOT_FOUND,
    ///     headers: HeaderMap::new(),
    ///     raw_response: String::new(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::TransportFailure(_) => true,
            FetchError::InvalidResponse => true,
            FetchError::BadStatusCode { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::BadData { .. } => false,
            FetchError::DecodeFailure { .. } => false,
            FetchError::RetriesExhausted { .. } => false,
            FetchError::Cancelled { .. } => false,
            FetchError::InvalidUrl(_) => false,
            FetchError::Configuration(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::BadStatusCode { status, .. } => Some(*status),
            FetchError::BadData { status } => Some(*status),
            FetchError::DecodeFailure { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            FetchError::BadStatusCode { raw_response, .. } => Some(raw_response),
            FetchError::DecodeFailure { raw_response, .. } => Some(raw_response),
            FetchError::RetriesExhausted { last_error, .. } => last_error.raw_response(),
            _ => None,
        }
    }

    /// Returns the underlying error, looking through `RetriesExhausted`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::RetriesExhausted { last_error, .. } => last_error.root_cause(),
            other => other,
        }
    }
}

/// Errors raised by a [`Transport`](crate::Transport) before any response
/// exists.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// A network-level error from `reqwest` (connection, DNS, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The attempt did not finish within the configured per-attempt timeout.
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport failure, for custom transports.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wraps an arbitrary error or message as a transport failure.
    pub fn other(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError::Other(error.into())
    }
}

/// A specialized `Result` type for fetches.
pub type Result<T> = std::result::Result<T, FetchError>;
