//! Agent message API client
//!
//! Wraps a [`Transport`] with the endpoint layout, payload shape and
//! authorization scheme of the agent message API.

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::reply;
use super::transport::{HttpRequest, RawResponse, ReqwestTransport, Transport, TransportError};
use crate::config::ClientConfig;
use crate::dataset::TestCaseRecord;
use crate::utils::Timer;

/// Parsed response body
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    /// Interpret a raw body: event streams stay text, anything that parses
    /// as JSON becomes JSON, the rest is text.
    pub fn parse(raw: &str, content_type: Option<&str>) -> Self {
        if reply::is_event_stream_type(content_type) || raw.trim().is_empty() {
            return ApiBody::Text(raw.to_string());
        }

        match serde_json::from_str(raw) {
            Ok(value) => ApiBody::Json(value),
            Err(_) => ApiBody::Text(raw.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiBody::Json(value) => Some(value),
            ApiBody::Text(_) => None,
        }
    }

    /// Body as text; JSON bodies are serialized compactly
    pub fn text(&self) -> String {
        match self {
            ApiBody::Json(value) => value.to_string(),
            ApiBody::Text(text) => text.clone(),
        }
    }
}

/// Normalized result of one HTTP call
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: ApiBody,
    pub content_type: Option<String>,
    pub duration_ms: u64,
}

impl ApiResponse {
    pub fn from_raw(raw: RawResponse, duration_ms: u64) -> Self {
        let body = ApiBody::parse(&raw.body, raw.content_type.as_deref());
        Self {
            status_code: raw.status_code,
            body,
            content_type: raw.content_type,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn body_text(&self) -> String {
        self.body.text()
    }

    /// Case-insensitive substring search.
    ///
    /// Checks the body text, then the decoded string values of a JSON body,
    /// then the extracted reply, so quotes and newlines in the needle match
    /// their unescaped form.
    pub fn body_contains_ignore_case(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let found = |text: &str| text.to_lowercase().contains(&needle);

        if found(&self.body_text()) {
            return true;
        }
        if let Some(value) = self.body.as_json() {
            if any_string_leaf(value, &found) {
                return true;
            }
        }
        found(&self.reply_text())
    }

    /// Look up a non-null JSON field by dotted path or JSON pointer
    pub fn field(&self, path: &str) -> Option<&Value> {
        self.body
            .as_json()?
            .pointer(&to_json_pointer(path))
            .filter(|v| !v.is_null())
    }

    /// Human-readable assistant reply
    pub fn reply_text(&self) -> String {
        reply::extract_reply(&self.body, self.content_type.as_deref())
    }
}

fn any_string_leaf(value: &Value, found: &impl Fn(&str) -> bool) -> bool {
    match value {
        Value::String(s) => found(s),
        Value::Array(items) => items.iter().any(|v| any_string_leaf(v, found)),
        Value::Object(map) => map.values().any(|v| any_string_leaf(v, found)),
        _ => false,
    }
}

/// Convert `a.b.0` into `/a/b/0`; strings starting with `/` pass through.
pub fn to_json_pointer(path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    path.split('.')
        .map(|segment| segment.replace('~', "~0").replace('/', "~1"))
        .fold(String::new(), |mut pointer, segment| {
            pointer.push('/');
            pointer.push_str(&segment);
            pointer
        })
}

/// `Authorization` header value for a token
pub fn bearer_value(token: &str) -> String {
    if token.to_ascii_lowercase().starts_with("bearer ") {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

/// Authorization value safe for logs
pub fn redact_authorization(value: &str) -> String {
    match value.split_once(' ') {
        Some((scheme, _)) => format!("{scheme} [REDACTED]"),
        None => "[REDACTED]".to_string(),
    }
}

/// Conversation identifiers embedded in the message payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageIds<'a> {
    pub thread_id: &'a str,
    pub session_id: &'a str,
    pub device_id: Option<&'a str>,
}

/// Client for the agent message endpoint
pub struct ApiClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: ClientConfig,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client backed by reqwest
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout(), config.insecure_tls)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build full URL for a path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn default_ids(&self) -> MessageIds<'_> {
        MessageIds {
            thread_id: &self.config.thread_id,
            session_id: &self.config.session_id,
            device_id: self.config.device_id.as_deref(),
        }
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        if self.config.auth_token.is_empty() {
            request
        } else {
            request.header("authorization", bearer_value(&self.config.auth_token))
        }
    }

    /// Message payload for a query
    pub fn build_payload(query: &str, ids: &MessageIds<'_>) -> Value {
        let mut payload = json!({
            "thread_id": ids.thread_id,
            "session_id": ids.session_id,
            "content": [{"type": "text", "text": query}],
        });
        if let Some(device_id) = ids.device_id {
            payload["device_id"] = Value::String(device_id.to_string());
        }
        payload
    }

    /// Send a query with the configured conversation identifiers
    pub async fn send_query(&self, query: &str) -> Result<ApiResponse, TransportError> {
        let ids = self.default_ids();
        self.send_message(query, &ids).await
    }

    /// Send a dataset record, applying its per-row identifier overrides
    pub async fn send_case(&self, record: &TestCaseRecord) -> Result<ApiResponse, TransportError> {
        let defaults = self.default_ids();
        let ids = MessageIds {
            thread_id: record.thread_id.as_deref().unwrap_or(defaults.thread_id),
            session_id: record.session_id.as_deref().unwrap_or(defaults.session_id),
            device_id: record.device_id.as_deref().or(defaults.device_id),
        };
        self.send_message(&record.query, &ids).await
    }

    /// POST a message to the configured endpoint
    pub async fn send_message(
        &self,
        query: &str,
        ids: &MessageIds<'_>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(&self.config.endpoint);
        let payload = Self::build_payload(query, ids);

        let request = self.authorize(
            HttpRequest::post(&url)
                .header("accept", "application/json")
                .header("content-type", "application/json")
                .body(payload.to_string()),
        );

        self.log_request(&request);
        self.execute(request).await
    }

    /// GET the configured health path
    pub async fn health(&self) -> Result<ApiResponse, TransportError> {
        let url = self.build_url(&self.config.health_path);
        let request = self.authorize(HttpRequest::get(url).header("accept", "application/json"));

        self.log_request(&request);
        self.execute(request).await
    }

    async fn execute(&self, request: HttpRequest) -> Result<ApiResponse, TransportError> {
        let timer = Timer::start(format!("{} {}", request.method, request.url));
        let raw = self.transport.execute(request).await?;
        let duration_ms = timer.stop();

        info!("-> status={} elapsed={}ms", raw.status_code, duration_ms);
        Ok(ApiResponse::from_raw(raw, duration_ms))
    }

    fn log_request(&self, request: &HttpRequest) {
        debug!("PREPARED {} {}", request.method, request.url);
        for (key, value) in &request.headers {
            if key.eq_ignore_ascii_case("authorization") {
                debug!("REQ-HEADER {}: {}", key, redact_authorization(value));
            } else {
                debug!("REQ-HEADER {}: {}", key, value);
            }
        }
        if let Some(body) = &request.body {
            debug!("REQ-BODY: {}", body);
        }
    }
}
