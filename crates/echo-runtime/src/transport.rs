//! HTTP transport to the Runtime API.
//!
//! Every call resolves to an [`HttpOutcome`]: `Ok` whenever *any* HTTP
//! response came back (4xx and 5xx included), `Err` only when no usable
//! response exists. Status codes are not interpreted here.

use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("echo-bootstrap/", env!("CARGO_PKG_VERSION"));

/// Result of a single HTTP call.
pub type HttpOutcome = Result<HttpResponse, TransportError>;

/// A response as seen by the bootstrap: status, headers, and the body
/// decoded as UTF-8 (empty when absent or not valid UTF-8).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

/// Transport-level failures. No response object is available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("request failed: {0}")]
    Send(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two calls the poll loop makes against the Runtime API.
pub trait Transport {
    /// GET `url` with no body.
    fn get(&self, url: &Uri) -> impl Future<Output = HttpOutcome> + Send;

    /// POST `body` to `url` as UTF-8 bytes. No content type is set.
    fn post(&self, url: &Uri, body: String) -> impl Future<Output = HttpOutcome> + Send;
}

/// hyper-backed transport over plain HTTP/1.1.
///
/// Connections are pooled by the underlying client. No timeout is applied;
/// a stalled Runtime API stalls the caller.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self { client }
    }

    async fn send(&self, method: Method, url: &Uri, body: Bytes) -> HttpOutcome {
        let req = Request::builder()
            .method(method)
            .uri(url.clone())
            .header(http::header::USER_AGENT, USER_AGENT)
            .body(Full::new(body))?;

        let resp = self.client.request(req).await?;
        let (parts, body) = resp.into_parts();

        // A response whose body cannot be read is still a transport failure.
        let bytes = body.collect().await?.to_bytes();
        debug!(%url, status = %parts.status, len = bytes.len(), "runtime API response");

        Ok(HttpResponse {
            status: parts.status,
            headers: parts.headers,
            body: decode_body(&bytes),
        })
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    async fn get(&self, url: &Uri) -> HttpOutcome {
        self.send(Method::GET, url, Bytes::new()).await
    }

    async fn post(&self, url: &Uri, body: String) -> HttpOutcome {
        self.send(Method::POST, url, Bytes::from(body)).await
    }
}

/// Decode a body as UTF-8, falling back to empty text.
pub fn decode_body(bytes: &[u8]) -> String {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .unwrap_or_default()
}
