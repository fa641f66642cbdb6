//! Test helpers: a recording mock transport and client builders.

use crate::api::client::TcgClient;
use crate::api::transport::{Body, HttpRequest, Params, RawResponse, Transport};
use crate::config::Config;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&HttpRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// Mock transport that answers through a closure and records every request.
#[derive(Clone)]
pub struct MockTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self { handler: Arc::new(handler), requests: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Answers every request with the same body.
    pub fn always(body: Value) -> Self {
        Self::new(move |_| Ok(ok(body.clone())))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of recorded requests whose URL ends with `suffix`.
    pub fn count_to(&self, suffix: &str) -> usize {
        self.requests().iter().filter(|r| r.url.ends_with(suffix)).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

pub fn ok(body: Value) -> RawResponse {
    RawResponse { status: 200, body }
}

pub fn test_config() -> Config {
    Config {
        base_url: "http://api.test".to_string(),
        public_key: Some("public".to_string()),
        private_key: Some("private".to_string()),
        ..Config::default()
    }
}

pub fn client(transport: MockTransport) -> TcgClient {
    TcgClient::with_transport(&test_config(), transport)
}

pub fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

/// Reads a parameter from a recorded query-string or JSON request.
pub fn param(request: &HttpRequest, key: &str) -> Option<Value> {
    match &request.body {
        Body::Query(p) | Body::Json(p) => p.get(key).cloned(),
        Body::Form(fields) => {
            fields.iter().find(|(k, _)| k == key).map(|(_, v)| Value::String(v.clone()))
        }
    }
}

pub fn token_body(token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 1209599,
        ".issued": "Wed, 12 Jan 2022 03:35:00 GMT",
        ".expires": "Fri, 01 Jan 2100 00:00:00 GMT"
    })
}

pub fn bearer_error() -> Value {
    json!({ "success": false, "errors": ["No bearer token was found"], "results": [] })
}
