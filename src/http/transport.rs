//! HTTP transport layer
//!
//! The [`Transport`] trait is the seam between the API client and the
//! network. [`ReqwestTransport`] is the production implementation; tests
//! substitute a stub.

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure to complete an HTTP exchange.
///
/// A completed exchange with a 4xx/5xx status is *not* a transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection failed to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl TransportError {
    /// Short machine-friendly label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Connect { .. } => "connect",
            TransportError::InvalidRequest(_) => "invalid_request",
            TransportError::RequestFailed(_) => "request_failed",
        }
    }
}

/// Outbound HTTP request
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Completed HTTP exchange before body interpretation
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            content_type: None,
            body: body.into(),
        }
    }

    #[cfg(test)]
    pub fn json(status_code: u16, value: &serde_json::Value) -> Self {
        Self {
            status_code,
            content_type: Some("application/json".to_string()),
            body: value.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Executes HTTP requests
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout
    pub fn new(timeout: Duration, insecure_tls: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_tls)
            .user_agent(concat!("agent-query-harness/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else if error.is_builder() {
            TransportError::InvalidRequest(error.to_string())
        } else {
            TransportError::RequestFailed(error.to_string())
        }
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut req_builder = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header {key}: {e}")))?;
            req_builder = req_builder.header(name, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| self.classify(&request.url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(&request.url, e))?;

        debug!(
            "Response: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        let mut raw = RawResponse::new(status.as_u16(), body);
        if let Some(content_type) = content_type {
            raw = raw.with_content_type(content_type);
        }
        Ok(raw)
    }
}
