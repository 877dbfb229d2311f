//! Raw transport output and the decoded response wrapper.
//!
//! A [`RawResponse`] is whatever one transport attempt produced, unvalidated.
//! A [`Response`] is what a successful fetch hands back: the decoded value
//! together with the HTTP details of the attempt that produced it.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A decoded top-level JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Metadata attached to a raw response.
#[derive(Debug, Clone)]
pub enum ResponseMeta {
    /// The response came from an HTTP exchange.
    Http {
        /// The HTTP status code
        status: StatusCode,
        /// The response headers
        headers: HeaderMap,
    },
    /// The response did not come from an HTTP exchange (e.g. a `file:` or
    /// in-memory source). Never accepted by the fetcher.
    Other,
}

/// The unvalidated result of one transport attempt.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// The payload, if any.
    pub body: Option<Bytes>,
    /// The response metadata, if any.
    pub meta: Option<ResponseMeta>,
}

impl RawResponse {
    /// A raw response from an HTTP exchange.
    pub fn http(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            meta: Some(ResponseMeta::Http { status, headers }),
        }
    }

    /// Replaces the payload.
    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body;
        self
    }
}

/// A successfully decoded response.
///
/// # Type Parameters
///
/// * `T` - The decoded value, [`JsonObject`] for plain fetches
///
/// # Examples
///
/// ```no_run
/// use jsonfetch::{Fetcher, JsonObject, Request, ReqwestTransport, Response};
///
/// # async fn example() -> Result<(), jsonfetch::FetchError> {
/// let fetcher = Fetcher::builder(ReqwestTransport::new()).build()?;
/// let request = Request::get("https://api.example.com/users/123")?;
///
/// let response: Response<JsonObject> = fetcher.fetch_response(&request).await?;
///
/// println!("Keys: {:?}", response.keys().collect::<Vec<_>>());
/// println!("Fetch took {:?} over {} attempts", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded data.
    pub data: T,

    /// The raw payload of the successful attempt.
    pub raw_body: Bytes,

    /// The HTTP status code of the successful attempt.
    pub status: StatusCode,

    /// The response headers of the successful attempt.
    pub headers: HeaderMap,

    /// Time from issuing the first attempt to decoding the successful one,
    /// including any backoff between attempts.
    pub latency: Duration,

    /// The number of attempts made, `1` when the first attempt succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: Bytes,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the decoded data while keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use jsonfetch::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     bytes::Bytes::from_static(b"42"),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the fetch needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
