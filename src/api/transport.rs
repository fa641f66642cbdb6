//! HTTP transport for API requests using wreq.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use wreq::Client;

/// Request parameters as sent to the API.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Where the request parameters travel.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Encoded into the URL query string.
    Query(Params),
    /// Sent as a JSON document.
    Json(Params),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

/// A fully described request, ready for a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub auth_token: Option<String>,
    pub user_agent: String,
    pub body: Body,
}

/// Decoded response: status plus parsed JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Trait for sending API requests - enables mocking for tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the decoded JSON response.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a wreq client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given request timeout and optional proxy
    /// (e.g. `socks5://host:port`).
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url)
                .map_err(|e| TransportError::Request(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let url = match &request.body {
            Body::Query(params) if !params.is_empty() => {
                format!("{}?{}", request.url, encode_query(params))
            }
            _ => request.url.clone(),
        };

        debug!("{} {}", request.method, url);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };

        builder = builder
            .header("Accept", "application/json")
            .header("User-Agent", request.user_agent.as_str());

        if let Some(token) = &request.auth_token {
            builder = builder.header("Authorization", format!("bearer {}", token));
        }

        builder = match request.body {
            Body::Query(_) => builder,
            Body::Json(params) => {
                let json = serde_json::to_string(&params)
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                builder.header("Content-Type", "application/json").body(json)
            }
            Body::Form(fields) => builder
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(encode_form(&fields)),
        };

        let response =
            builder.send().await.map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        debug!("Response status: {}", status);

        let text = response.text().await.map_err(|e| TransportError::Request(e.to_string()))?;

        decode_response(status, &text)
    }
}

/// Applies the status policy: 2xx bodies must be JSON; non-2xx bodies are
/// returned only when they carry the API's `errors` envelope.
fn decode_response(status: u16, text: &str) -> Result<RawResponse, TransportError> {
    let parsed: Result<Value, _> = serde_json::from_str(text);

    if (200..300).contains(&status) {
        let body = parsed.map_err(|e| TransportError::Decode(e.to_string()))?;
        return Ok(RawResponse { status, body });
    }

    match parsed {
        Ok(body) if body.get("errors").is_some_and(Value::is_array) => {
            Ok(RawResponse { status, body })
        }
        _ => Err(TransportError::Status { status, body: text.to_string() }),
    }
}

/// Encodes parameters as a query string. Arrays are comma-joined and objects
/// are sent as compact JSON.
pub fn encode_query(params: &Params) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(&param_text(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(param_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5), None).unwrap()
    }

    fn request(method: Method, url: String, body: Body) -> HttpRequest {
        HttpRequest {
            method,
            url,
            auth_token: Some("tok".to_string()),
            user_agent: "tcg-client-test".to_string(),
            body,
        }
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_encode_query() {
        let encoded = encode_query(&params(json!({
            "limit": 10,
            "sortOrder": "name asc",
            "ids": [1, 2],
            "skip": null,
            "flag": true
        })));
        assert_eq!(encoded, "flag=true&ids=1%2C2&limit=10&sortOrder=name%20asc");
    }

    #[test]
    fn test_decode_success() {
        let raw = decode_response(200, r#"{"success":true}"#).unwrap();
        assert_eq!(raw.body, json!({ "success": true }));
    }

    #[test]
    fn test_decode_error_envelope() {
        let raw = decode_response(401, r#"{"success":false,"errors":["No bearer token"]}"#).unwrap();
        assert_eq!(raw.status, 401);
        assert_eq!(raw.body["errors"][0], "No bearer token");
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(decode_response(200, "<html>"), Err(TransportError::Decode(_))));
        assert!(matches!(
            decode_response(500, "oops"),
            Err(TransportError::Status { status: 500, .. })
        ));
        assert!(matches!(
            decode_response(404, r#"{"message":"not found"}"#),
            Err(TransportError::Status { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_with_query_and_auth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/catalog/categories"))
            .and(query_param("limit", "5"))
            .and(header("Authorization", "bearer tok"))
            .and(header("User-Agent", "tcg-client-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&mock_server)
            .await;

        let req = request(
            Method::Get,
            format!("{}/catalog/categories", mock_server.uri()),
            Body::Query(params(json!({ "limit": 5 }))),
        );
        let raw = transport().send(req).await.unwrap();
        assert_eq!(raw.status, 200);
        assert_eq!(raw.body["success"], true);
    }

    #[tokio::test]
    async fn test_post_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/catalog/categories/3/search"))
            .and(body_json(json!({ "sort": "ProductName ASC", "limit": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [1] })))
            .mount(&mock_server)
            .await;

        let req = request(
            Method::Post,
            format!("{}/catalog/categories/3/search", mock_server.uri()),
            Body::Json(params(json!({ "sort": "ProductName ASC", "limit": 10 }))),
        );
        let raw = transport().send(req).await.unwrap();
        assert_eq!(raw.body["results"], json!([1]));
    }

    #[tokio::test]
    async fn test_post_form() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string("grant_type=client_credentials&client_id=pub"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "x" })))
            .mount(&mock_server)
            .await;

        let mut req = request(
            Method::Post,
            format!("{}/token", mock_server.uri()),
            Body::Form(vec![
                ("grant_type".to_string(), "client_credentials".to_string()),
                ("client_id".to_string(), "pub".to_string()),
            ]),
        );
        req.auth_token = None;
        let raw = transport().send(req).await.unwrap();
        assert_eq!(raw.body["access_token"], "x");
    }

    #[tokio::test]
    async fn test_http_error_500() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pricing/product/1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let req = request(
            Method::Get,
            format!("{}/pricing/product/1", mock_server.uri()),
            Body::Query(Params::new()),
        );
        let err = transport().send(req).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let req = request(
            Method::Get,
            "http://127.0.0.1:1/unreachable".to_string(),
            Body::Query(Params::new()),
        );
        let err = transport().send(req).await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
