//! Test doubles for the Runtime API.
//!
//! [`ScriptedTransport`] replays canned outcomes without touching the
//! network. [`MockRuntimeApi`] is a real hyper server on a loopback port
//! that hands out scripted invocations and records the responses posted
//! back to it.
//!
//! Both end the loop once their script runs out: the scripted transport
//! fails further GETs, and the mock server answers them without a request
//! id header.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::future::{ready, Future};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use echo_core::REQUEST_ID_HEADER;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::transport::{decode_body, HttpOutcome, HttpResponse, Transport, TransportError};

const NEXT_INVOCATION_PATH: &str = "/runtime/invocation/next";

/// A request seen by a test double.
///
/// `url` is the full URL for [`ScriptedTransport`] and the path for
/// [`MockRuntimeApi`]. `body` is `None` for GETs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn header_map(headers: &[(&str, &str)]) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
            let value = HeaderValue::from_str(value).ok()?;
            Some((name, value))
        })
        .collect()
}

fn refused(reason: &str) -> TransportError {
    TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        reason.to_string(),
    ))
}

// ── Scripted transport ──────────────────────────────────────────────

#[derive(Default)]
struct Script {
    gets: VecDeque<HttpOutcome>,
    posts: VecDeque<HttpOutcome>,
    calls: Vec<RecordedCall>,
}

/// In-memory [`Transport`] that replays queued outcomes.
///
/// Clones share the same script, so a test can keep a handle after
/// moving one into a [`PollLoop`](crate::PollLoop). An empty GET queue
/// yields a connection-refused error; an empty POST queue yields
/// `202 Accepted`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a next-invocation response carrying `request_id`.
    pub fn push_invocation(&self, request_id: &str, payload: &str) {
        self.push_get_response(StatusCode::OK, &[(REQUEST_ID_HEADER, request_id)], payload);
    }

    pub fn push_get_response(&self, status: StatusCode, headers: &[(&str, &str)], body: &str) {
        let resp = HttpResponse::new(status, header_map(headers), body);
        lock(&self.script).gets.push_back(Ok(resp));
    }

    pub fn push_get_failure(&self, reason: &str) {
        lock(&self.script).gets.push_back(Err(refused(reason)));
    }

    pub fn push_post_response(&self, status: StatusCode, body: &str) {
        let resp = HttpResponse::new(status, HeaderMap::new(), body);
        lock(&self.script).posts.push_back(Ok(resp));
    }

    pub fn push_post_failure(&self, reason: &str) {
        lock(&self.script).posts.push_back(Err(refused(reason)));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.script).calls.clone()
    }

    pub fn gets(&self) -> Vec<RecordedCall> {
        self.filter_calls(Method::GET)
    }

    pub fn posts(&self) -> Vec<RecordedCall> {
        self.filter_calls(Method::POST)
    }

    fn filter_calls(&self, method: Method) -> Vec<RecordedCall> {
        lock(&self.script)
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn next_outcome(&self, method: Method, url: &Uri, body: Option<String>) -> HttpOutcome {
        let mut script = lock(&self.script);
        script.calls.push(RecordedCall {
            method: method.clone(),
            url: url.to_string(),
            body,
        });
        if method == Method::GET {
            script
                .gets
                .pop_front()
                .unwrap_or_else(|| Err(refused("script exhausted")))
        } else {
            script
                .posts
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(StatusCode::ACCEPTED, HeaderMap::new(), "")))
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Uri) -> impl Future<Output = HttpOutcome> + Send {
        ready(self.next_outcome(Method::GET, url, None))
    }

    fn post(&self, url: &Uri, body: String) -> impl Future<Output = HttpOutcome> + Send {
        ready(self.next_outcome(Method::POST, url, Some(body)))
    }
}

// ── Mock Runtime API server ─────────────────────────────────────────

/// One scripted answer to `GET /runtime/invocation/next`.
#[derive(Debug, Clone)]
pub struct MockInvocation {
    pub request_id: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockInvocation {
    pub fn new(request_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// An answer the bootstrap must reject.
    pub fn without_request_id(body: impl Into<String>) -> Self {
        Self {
            request_id: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

struct ServerScript {
    invocations: VecDeque<MockInvocation>,
    requests: Vec<RecordedCall>,
}

/// Loopback HTTP server standing in for the Runtime API.
///
/// Stops when dropped.
pub struct MockRuntimeApi {
    addr: SocketAddr,
    script: Arc<Mutex<ServerScript>>,
    handle: JoinHandle<()>,
}

impl MockRuntimeApi {
    /// Bind to an ephemeral loopback port and start serving.
    pub async fn start(
        invocations: impl IntoIterator<Item = MockInvocation>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock runtime API")?;
        let addr = listener.local_addr()?;

        let script = Arc::new(Mutex::new(ServerScript {
            invocations: invocations.into_iter().collect(),
            requests: Vec::new(),
        }));

        let server_script = script.clone();
        let handle = tokio::spawn(async move {
            loop {
                let stream = match listener.accept().await {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        debug!(error = %e, "mock runtime API accept failed");
                        break;
                    }
                };
                let script = server_script.clone();

                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let script = script.clone();
                        async move { Ok::<_, Infallible>(handle_request(&script, req).await) }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                        debug!(error = %e, "mock runtime API connection error");
                    }
                });
            }
        });

        Ok(Self {
            addr,
            script,
            handle,
        })
    }

    /// The `host:port` to hand to the bootstrap.
    pub fn host_port(&self) -> String {
        self.addr.to_string()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedCall> {
        lock(&self.script).requests.clone()
    }

    /// The invocation responses posted so far.
    pub fn responses(&self) -> Vec<RecordedCall> {
        lock(&self.script)
            .requests
            .iter()
            .filter(|r| r.method == Method::POST)
            .cloned()
            .collect()
    }

    /// Wait until at least `count` responses have been posted.
    pub async fn wait_for_responses(
        &self,
        count: usize,
        timeout: Duration,
    ) -> anyhow::Result<Vec<RecordedCall>> {
        tokio::time::timeout(timeout, async {
            loop {
                let responses = self.responses();
                if responses.len() >= count {
                    return responses;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| format!("timed out waiting for {count} invocation responses"))
    }
}

impl Drop for MockRuntimeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    script: &Mutex<ServerScript>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(collected) => decode_body(&collected.to_bytes()),
        Err(_) => String::new(),
    };

    let mut script = lock(script);
    script.requests.push(RecordedCall {
        method: method.clone(),
        url: path.clone(),
        body: (method == Method::POST).then_some(body),
    });

    if method == Method::GET && path == NEXT_INVOCATION_PATH {
        let invocation = script
            .invocations
            .pop_front()
            .unwrap_or_else(|| MockInvocation::without_request_id("{}"));
        return invocation_response(invocation);
    }

    if method == Method::POST
        && path.starts_with("/runtime/invocation/")
        && path.ends_with("/response")
    {
        return plain(StatusCode::ACCEPTED, r#"{"status":"OK"}"#);
    }

    plain(StatusCode::NOT_FOUND, "not found")
}

fn invocation_response(invocation: MockInvocation) -> Response<Full<Bytes>> {
    let mut resp = plain(StatusCode::OK, invocation.body);
    let mut headers: Vec<(&str, &str)> = invocation
        .headers
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();
    if let Some(id) = invocation.request_id.as_deref() {
        headers.push((REQUEST_ID_HEADER, id));
    }
    resp.headers_mut().extend(header_map(&headers));
    resp
}

fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    resp
}
