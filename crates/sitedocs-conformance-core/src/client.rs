// crates/sitedocs-conformance-core/src/client.rs
// ============================================================================
// Module: SiteDocs HTTP Client
// Description: Request issuing and response capture for conformance checks.
// Purpose: Send catalog requests with a chosen credential and keep transcripts.
// Dependencies: reqwest, serde, serde_json, tokio, tracing, url
// ============================================================================

//! ## Overview
//! [`ApiClient`] wraps a `reqwest::Client` bound to the configured base URL
//! and API key. Every request is recorded in a shared transcript (method,
//! path, credential label, status, timing) so reports can show exactly what
//! was exchanged. The key itself is never recorded or logged.
//!
//! Connection failures are retried a few times with a short backoff since the
//! request never reached the server. Other transport failures are returned
//! immediately so mutating requests are not replayed blindly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use reqwest::Client;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::config::ConformanceConfig;
use crate::credential::ApiKey;
use crate::credential::Credential;
use crate::endpoints::Endpoint;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum attempts for requests that failed to connect.
const MAX_HTTP_SEND_ATTEMPTS: u32 = 3;
/// Base backoff delay for connection retries.
const BASE_HTTP_SEND_RETRY_DELAY_MS: u64 = 50;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP client failures. Status codes are not errors; they are asserted on.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Build(String),
    /// The base URL cannot have path segments appended.
    #[error("base url {0} cannot carry endpoint paths")]
    BaseUrl(Url),
    /// The request could not be sent or the response could not be read.
    #[error("{method} {path} failed: {source}")]
    Transport {
        /// Request method.
        method: Method,
        /// Request path relative to the base URL.
        path: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// One request against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Target endpoint.
    pub endpoint: Endpoint,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// JSON body for mutating verbs.
    pub body: Option<Value>,
    /// Credential to send.
    pub credential: Credential,
}

impl ApiRequest {
    /// Builds a request with no body or query, using the configured key.
    #[must_use]
    pub const fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            body: None,
            credential: Credential::Configured,
        }
    }

    /// `GET` request.
    #[must_use]
    pub const fn get(endpoint: Endpoint) -> Self {
        Self::new(Method::GET, endpoint)
    }

    /// `PATCH` request with a JSON body.
    #[must_use]
    pub fn patch(endpoint: Endpoint, body: Value) -> Self {
        Self::new(Method::PATCH, endpoint).with_body(body)
    }

    /// `PUT` request with a JSON body.
    #[must_use]
    pub fn put(endpoint: Endpoint, body: Value) -> Self {
        Self::new(Method::PUT, endpoint).with_body(body)
    }

    /// `POST` request with a JSON body.
    #[must_use]
    pub fn post(endpoint: Endpoint, body: Value) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    /// `DELETE` request with a JSON body.
    #[must_use]
    pub fn delete(endpoint: Endpoint, body: Value) -> Self {
        Self::new(Method::DELETE, endpoint).with_body(body)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the credential.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Path and query relative to the base URL, for logs and transcripts.
    #[must_use]
    pub fn display_path(&self) -> String {
        let mut path = self.endpoint.to_string();
        for (index, (key, value)) in self.query.iter().enumerate() {
            path.push(if index == 0 { '?' } else { '&' });
            path.push_str(key);
            path.push('=');
            path.push_str(value);
        }
        path
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No bytes were returned.
    Empty,
    /// Body parsed as JSON.
    Json(Value),
    /// Textual body that is not JSON.
    Text(String),
    /// Binary body (images and other non-text media).
    Binary(Vec<u8>),
}

/// Captured response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded body.
    pub body: ResponseBody,
}

impl ApiResponse {
    /// JSON body, when the response carried one.
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Media type from `Content-Type`, without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        media_type(&self.headers)
    }

    /// Body length in bytes (JSON bodies are measured re-serialized).
    #[must_use]
    pub fn body_len(&self) -> usize {
        match &self.body {
            ResponseBody::Empty => 0,
            ResponseBody::Json(value) => value.to_string().len(),
            ResponseBody::Text(text) => text.len(),
            ResponseBody::Binary(bytes) => bytes.len(),
        }
    }
}

// ============================================================================
// SECTION: Transcript
// ============================================================================

/// One recorded exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    /// Monotonic sequence number within the client.
    pub sequence: u64,
    /// Request method.
    pub method: String,
    /// Path and query relative to the base URL.
    pub path: String,
    /// Credential label (`configured`, `sentinel`, `anonymous`).
    pub credential: &'static str,
    /// Status code when a response arrived.
    pub status: Option<u16>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Transport error text when no response arrived.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// SiteDocs API client with transcript capture.
#[derive(Clone)]
pub struct ApiClient {
    /// Base URL endpoint paths are appended to.
    base_url: Url,
    /// Underlying HTTP client.
    client: Client,
    /// Configured API key.
    api_key: ApiKey,
    /// Shared transcript across clones.
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl ApiClient {
    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the base URL cannot carry paths or the
    /// HTTP client cannot be built.
    pub fn new(base_url: Url, api_key: ApiKey, timeout: Duration) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self {
            base_url,
            client,
            api_key,
            transcript: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Creates a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the HTTP client cannot be built.
    pub fn from_config(config: &ConformanceConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone(), config.api_key.clone(), config.http_timeout)
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns a snapshot of the transcript entries.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Resolves the absolute URL for an endpoint and query.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BaseUrl`] when the base URL cannot carry paths.
    pub fn url_for(&self, endpoint: &Endpoint, query: &[(String, String)]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments =
                url.path_segments_mut().map_err(|()| ClientError::BaseUrl(self.base_url.clone()))?;
            segments.pop_if_empty();
            segments.extend(endpoint.segments());
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Sends a request and captures status, headers, and decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when no response could be obtained.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = self.url_for(&request.endpoint, &request.query)?;
        let path = request.display_path();
        let started = Instant::now();
        let result = self.send_with_retry(request, url).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (status, error) = match &result {
            Ok(response) => (Some(response.status.as_u16()), None),
            Err(err) => (None, Some(err.to_string())),
        };
        debug!(
            method = %request.method,
            path = %path,
            credential = request.credential.label(),
            status = status.unwrap_or_default(),
            duration_ms,
            "request completed"
        );
        self.record(TranscriptEntry {
            sequence: 0,
            method: request.method.to_string(),
            path: path.clone(),
            credential: request.credential.label(),
            status,
            duration_ms,
            error,
        });
        result.map_err(|source| ClientError::Transport {
            method: request.method.clone(),
            path,
            source,
        })
    }

    /// Sends once per attempt, retrying only when the connection failed.
    async fn send_with_retry(
        &self,
        request: &ApiRequest,
        url: Url,
    ) -> Result<ApiResponse, reqwest::Error> {
        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);
            let mut builder = self.client.request(request.method.clone(), url.clone());
            if let Some(value) = request.credential.header_value(&self.api_key) {
                builder = builder.header(AUTHORIZATION, value);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            match builder.send().await {
                Ok(response) => return capture(response).await,
                Err(err) if err.is_connect() && attempt < MAX_HTTP_SEND_ATTEMPTS => {
                    let backoff = BASE_HTTP_SEND_RETRY_DELAY_MS.saturating_mul(u64::from(attempt));
                    debug!(attempt, error = %err, "connection failed; retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Appends a transcript entry with the next sequence number.
    fn record(&self, mut entry: TranscriptEntry) {
        if let Ok(mut entries) = self.transcript.lock() {
            entry.sequence = u64::try_from(entries.len()).unwrap_or(u64::MAX).saturating_add(1);
            entries.push(entry);
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a response into an [`ApiResponse`].
async fn capture(response: reqwest::Response) -> Result<ApiResponse, reqwest::Error> {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let body = decode_body(media_type(&headers), &bytes);
    Ok(ApiResponse {
        status,
        headers,
        body,
    })
}

/// Media type from a header map, lowercased by the caller's comparison.
fn media_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
}

/// Decodes a body based on its media type, sniffing JSON when unlabeled.
pub(crate) fn decode_body(media_type: Option<&str>, bytes: &[u8]) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }
    let media_type = media_type.map(str::to_ascii_lowercase);
    let is_json = media_type.as_deref().is_some_and(|mt| mt.ends_with("json"));
    let is_text = media_type.as_deref().is_some_and(|mt| mt.starts_with("text/"));
    let is_binary = media_type.as_deref().is_some_and(|mt| {
        mt.starts_with("image/") || mt.starts_with("audio/") || mt.starts_with("video/")
            || mt == "application/octet-stream"
            || mt == "application/pdf"
    });
    if is_binary {
        return ResponseBody::Binary(bytes.to_vec());
    }
    if (is_json || !is_text)
        && let Ok(value) = serde_json::from_slice::<Value>(bytes)
    {
        return ResponseBody::Json(value);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => ResponseBody::Text(text.to_string()),
        Err(_) => ResponseBody::Binary(bytes.to_vec()),
    }
}
