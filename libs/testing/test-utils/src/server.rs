//! In-process stub of the Eigenlake HTTP service
//!
//! `TestServer` binds an ephemeral port, records every request it receives and
//! replies from a FIFO script, falling back to a fixed response once the script
//! is exhausted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::debug;

/// One request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Value of the `X-API-Key` header, if sent
    pub api_key: Option<String>,
    /// JSON body, `None` when the body was empty
    pub body: Option<Value>,
}

/// A scripted reply
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: String,
    pub content_type: &'static str,
    pub headers: Vec<(HeaderName, String)>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json",
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "text/plain",
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::text(status, "")
    }

    /// Extra response header, e.g. `Location` on a redirect
    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Sleep before replying, to exercise client timeouts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::json(StatusCode::OK, Value::Object(Default::default()))
    }
}

#[derive(Default)]
struct ServerState {
    requests: Mutex<Vec<RecordedRequest>>,
    script: Mutex<VecDeque<MockResponse>>,
    fallback: Mutex<MockResponse>,
}

/// Stub server; stops when dropped
///
/// # Example
///
/// ```no_run
/// use test_utils::{MockResponse, StatusCode, TestServer};
///
/// # async fn example() {
/// let server = TestServer::start().await;
/// server.enqueue(MockResponse::json(StatusCode::OK, serde_json::json!({"ready": true})));
/// // point the client at server.url()
/// assert_eq!(server.request_count(), 0);
/// # }
/// ```
pub struct TestServer {
    url: String,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");

        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .fallback(record_and_reply)
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                debug!(error = %e, "Test server stopped");
            }
        });

        Self {
            url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue a reply for the next unanswered request
    pub fn enqueue(&self, response: MockResponse) {
        self.state
            .script
            .lock()
            .expect("script lock poisoned")
            .push_back(response);
    }

    /// Reply used once the script is empty (default: 200 `{}`)
    pub fn set_fallback(&self, response: MockResponse) {
        *self.state.fallback.lock().expect("fallback lock poisoned") = response;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .expect("requests lock poisoned")
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.state
            .requests
            .lock()
            .expect("requests lock poisoned")
            .len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// URL of a local port with nothing listening on it
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    drop(listener);
    format!("http://{}", addr)
}

async fn record_and_reply(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let recorded = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query,
        api_key: headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: if body.is_empty() {
            None
        } else {
            serde_json::from_slice(&body).ok()
        },
    };
    debug!(method = %recorded.method, path = %recorded.path, "Test server received request");
    state
        .requests
        .lock()
        .expect("requests lock poisoned")
        .push(recorded);

    let scripted = state.script.lock().expect("script lock poisoned").pop_front();
    let reply = match scripted {
        Some(reply) => reply,
        None => state.fallback.lock().expect("fallback lock poisoned").clone(),
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response =
        (reply.status, [(CONTENT_TYPE, reply.content_type)], reply.body).into_response();
    for (name, value) in reply.headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}
