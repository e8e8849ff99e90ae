//! HTTP client for sending outbound calls

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, StatusCode, Uri};
use tracing::{debug, warn};

use super::{CONNECT_TIMEOUT_SECS, MAX_BODY_SIZE, POOL_IDLE_TIMEOUT_SECS};
use crate::{MockwireError, Result};

/// An outbound call issued by the system under test
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute destination URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Fully buffered request body
    pub body: Bytes,
}

impl OutboundRequest {
    /// Create a request with no headers and an empty body
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Append a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the body
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A fully buffered upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response and content headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

/// Performs the actual network call for an admitted request
pub trait Transport: Send + Sync {
    /// Send the request and buffer the whole response
    fn send(
        &self,
        request: OutboundRequest,
    ) -> impl Future<Output = Result<UpstreamResponse>> + Send;
}

/// Pooled HTTP and HTTPS transport
///
/// Redirects are returned as-is so that they are recorded, not followed.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .pool_max_idle_per_host(10)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MockwireError::Transport(format!("Failed to build client: {e}")))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        if !matches!(request.uri.scheme_str(), Some("http" | "https")) {
            return Err(MockwireError::Transport(format!(
                "'{}' is not an HTTP(S) URL",
                request.uri
            )));
        }

        debug!("Sending {} {}", request.method, request.uri);

        let mut response = self
            .client
            .request(request.method, request.uri.to_string())
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                warn!("Request failed: {e}");
                MockwireError::Transport(format!("Request failed: {e}"))
            })?;

        let status = response.status();
        let headers = response.headers().clone();

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MockwireError::Transport(format!("Failed to read body: {e}")))?
        {
            let size = body.len() + chunk.len();
            if size > MAX_BODY_SIZE {
                return Err(MockwireError::DataTooLarge {
                    size,
                    limit: MAX_BODY_SIZE,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status,
            headers,
            body: body.freeze(),
        })
    }
}
