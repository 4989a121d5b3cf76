//! In-process transport stub for tests

use std::sync::Mutex;

use super::transport::{HttpRequest, RawResponse, Transport, TransportError};

type Responder = Box<dyn Fn(&HttpRequest) -> Result<RawResponse, TransportError> + Send + Sync>;

/// Transport that answers from a closure and records every request
pub struct StubTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the given JSON body
    pub fn json(status_code: u16, body: serde_json::Value) -> Self {
        Self::new(move |_| Ok(RawResponse::json(status_code, &body)))
    }

    /// Always fail with the given error
    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let result = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        result
    }
}
