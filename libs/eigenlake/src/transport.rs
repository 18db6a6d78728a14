//! HTTP transport with authentication, timeout and retry applied uniformly
//!
//! Every higher-level operation resolves to exactly one [`Transport::request`].
//! Each attempt is classified as success, retryable (network failure or 5xx)
//! or terminal (any other non-2xx, redirects included); only retryable attempts
//! are reissued. Redirects are never followed, so the API key stays on the
//! configured host.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{EigenlakeError, EigenlakeResult};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// A fully-read 2xx response
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    body: Vec<u8>,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body; a shape mismatch is reported as an API error
    pub fn json<T: DeserializeOwned>(&self) -> EigenlakeResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Outcome of a single attempt
#[derive(Debug)]
enum Attempt {
    Success(Response),
    Retryable(EigenlakeError),
    Terminal(EigenlakeError),
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Transport {
    pub fn new(config: Arc<ClientConfig>) -> EigenlakeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .default_headers(auth_headers(&config)?)
            .build()
            .map_err(|e| EigenlakeError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute one logical request, retrying network failures and 5xx responses
    #[instrument(skip(self, body, query))]
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: &[(&str, String)],
    ) -> EigenlakeResult<Response> {
        let url = format!("{}{}", self.config.base_url, normalize_path(path));
        let body = body.map(encode_body).transpose()?;
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&method, &url, body.as_deref(), query).await {
                Attempt::Success(response) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Request succeeded after retries");
                    }
                    return Ok(response);
                }
                Attempt::Terminal(err) => return Err(err),
                Attempt::Retryable(err) => {
                    if attempt >= self.config.retries {
                        warn!(attempts = attempt + 1, error = %err, "Request failed, retries exhausted");
                        return Err(err);
                    }
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
        query: &[(&str, String)],
    ) -> Attempt {
        let mut builder = self.client.request(method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(EigenlakeError::Network(e.to_string())),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => return Attempt::Retryable(EigenlakeError::Network(e.to_string())),
        };
        debug!(status = status.as_u16(), bytes = body.len(), "Received response");

        if status.is_success() {
            return Attempt::Success(Response { status, body });
        }

        let err = EigenlakeError::from_status(status, extract_detail(status, &body));
        if status.as_u16() >= 500 {
            Attempt::Retryable(err)
        } else {
            Attempt::Terminal(err)
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> EigenlakeResult<Response> {
        self.request::<Value>(Method::GET, path, None, query).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> EigenlakeResult<Response> {
        self.request(Method::POST, path, Some(body), &[]).await
    }

    pub async fn delete(&self, path: &str, query: &[(&str, String)]) -> EigenlakeResult<Response> {
        self.request::<Value>(Method::DELETE, path, None, query).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> EigenlakeResult<Response> {
        self.request(Method::PATCH, path, Some(body), &[]).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> EigenlakeResult<Response> {
        self.request(Method::PUT, path, Some(body), &[]).await
    }
}

fn auth_headers(config: &ClientConfig) -> EigenlakeResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
        let mut value = HeaderValue::from_str(key.expose())
            .map_err(|_| EigenlakeError::Validation("API key is not a valid header value".to_string()))?;
        value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, value);
    }
    Ok(headers)
}

/// Serialized straight to bytes so `f32` values keep their shortest form
fn encode_body<B: Serialize + ?Sized>(body: &B) -> EigenlakeResult<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|e| EigenlakeError::Validation(format!("invalid request body: {}", e)))
}

/// Paths are always root-relative
pub(crate) fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// `detail` field of a JSON object body, else the trimmed body, else `HTTP <status>`
pub(crate) fn extract_detail(status: StatusCode, body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        text.to_string()
    }
}
