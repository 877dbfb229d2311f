//! The transport seam: whatever performs the actual network exchange.
//!
//! The fetcher never talks to the network itself. It hands a [`Request`] to a
//! [`Transport`] once per attempt and validates whatever comes back.

use crate::{RawResponse, Request, TransportError};
use std::future::Future;
use std::sync::Arc;

/// Performs one network exchange per call.
///
/// Implementations must not retry on their own; the fetcher owns the retry
/// loop. Dropping the returned future must abandon the exchange.
///
/// # Examples
///
/// ```
/// use jsonfetch::{RawResponse, Request, Transport, TransportError};
/// use http::{HeaderMap, StatusCode};
/// use std::future::Future;
///
/// struct Canned;
///
/// impl Transport for Canned {
///     fn send(
///         &self,
///         _request: &Request,
///     ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
///         async { Ok(RawResponse::http(StatusCode::OK, HeaderMap::new(), r#"{"ok":true}"#)) }
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the raw, unvalidated response.
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

/// A [`Transport`] backed by a pooled `reqwest::Client`.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());

        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(RawResponse::http(status, headers, body))
        }
    }
}
