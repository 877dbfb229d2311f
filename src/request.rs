//! Immutable request descriptors.

use crate::{FetchError, Result};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::Url;

/// A single HTTP request to fetch JSON from.
///
/// A `Request` is built once and never changes; the fetcher re-sends the same
/// value on every attempt. The URL is always absolute and has a host.
///
/// # Examples
///
/// ```
/// use jsonfetch::Request;
/// use http::Method;
///
/// # fn example() -> Result<(), jsonfetch::FetchError> {
/// let request = Request::builder(Method::POST, "http://api.mysite.com/test")?
///     .header("Authentication", "token")?
///     .build();
///
/// assert_eq!(request.method(), &Method::POST);
/// assert_eq!(request.header("authentication"), Some("token"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// Starts building a request with the given method and absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the URL does not parse (relative
    /// URLs never do), or [`FetchError::Configuration`] if it has no host.
    pub fn builder(method: Method, url: impl AsRef<str>) -> Result<RequestBuilder> {
        let url = Url::parse(url.as_ref())?;
        if url.cannot_be_a_base() || url.host().is_none() {
            return Err(FetchError::Configuration(format!(
                "URL has no host: {}",
                url
            )));
        }

        Ok(RequestBuilder {
            request: Request {
                url,
                method,
                headers: HeaderMap::new(),
                body: None,
            },
        })
    }

    /// Builds a plain GET request.
    pub fn get(url: impl AsRef<str>) -> Result<Self> {
        Ok(Self::builder(Method::GET, url)?.build())
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Sets a header, replacing any previous value for the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| FetchError::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| FetchError::Configuration(format!("Invalid header value: {}", e)))?;
        self.request.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the body to the JSON encoding of `body`.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            FetchError::Configuration(format!("Failed to serialize request body: {}", e))
        })?;
        self.request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.request.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Finishes the request.
    pub fn build(self) -> Request {
        self.request
    }
}
