//! HTTP transport used to reach the Control Plane API.
//!
//! The reconciler only needs two primitives: a full-document `GET` and a
//! partial-replace `PATCH`. Both are expressed by the [`Transport`] trait so
//! the reconciler can be driven by [`HttpTransport`] in production and by an
//! in-memory remote in tests.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ProviderError;

/// Default API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.cpln.io";

/// Raw response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a response carrying a JSON document.
    pub fn json(status: u16, document: &Value) -> Self {
        Self::new(status, serde_json::to_vec(document).unwrap_or_default())
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is 404.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Turn a non-2xx response into a [`ProviderError::Transport`].
    pub fn into_error(self) -> ProviderError {
        let message = String::from_utf8_lossy(&self.body).trim().to_string();
        ProviderError::Transport {
            status: self.status,
            message: if message.is_empty() {
                "no response body".to_string()
            } else {
                message
            },
        }
    }
}

/// The requests the reconciler issues against the API.
///
/// Implementations return every response they receive, including non-2xx
/// ones. Mapping a status to success, absence or failure is the caller's job.
/// Only failures that produced no response at all are returned as `Err`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetch the document at `path`.
    async fn get(&self, path: &str) -> Result<TransportResponse, ProviderError>;

    /// Send a partial update to the document at `path`.
    async fn patch(&self, path: &str, body: &Value) -> Result<TransportResponse, ProviderError>;
}

/// Options for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Timeout applied to every request.
    /// Default: 30 seconds.
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl TransportOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`Transport`] backed by `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Build a transport for `endpoint`, authenticating with `token` when set.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        options: TransportOptions,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// The normalized base endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<TransportResponse, ProviderError> {
        let response = self.authorize(request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!(status, bytes = body.len(), "Response received");
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self), name = "http.get")]
    async fn get(&self, path: &str) -> Result<TransportResponse, ProviderError> {
        self.send(self.http.get(self.url(path))).await
    }

    #[instrument(skip(self, body), name = "http.patch")]
    async fn patch(&self, path: &str, body: &Value) -> Result<TransportResponse, ProviderError> {
        self.send(self.http.patch(self.url(path)).json(body)).await
    }
}
