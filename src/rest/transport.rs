//! HTTP transport for the REST backends
//!
//! Abstracts the HTTP connection for testability. Provides:
//! - Transport trait: one blocking request/response exchange
//! - MockTransport: canned responses and recorded requests for tests
//! - HttpTransport: real connection through `reqwest::blocking`

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Transport trait for REST communication
pub trait Transport: Send + Sync {
    /// Execute a request and return the response, whatever its status
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("JSON serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Multipart upload of a single file
    File { field: String, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Body,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: Body::Empty,
        }
    }

    pub fn post(url: impl Into<String>, body: Body) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body,
        }
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self {
            method: Method::Patch,
            url: url.into(),
            body: Body::Empty,
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            body: Body::Empty,
        }
    }

    /// Path and query, without scheme and authority
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}

fn path_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body
    pub fn json_body(status: u16, value: Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body. An empty body decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        Ok(serde_json::from_str(body)?)
    }
}

/// Real HTTP transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport whose every call is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TransportError::ConnectionFailed(format!("HTTP client setup: {}", e)))?;
        Ok(Self { client })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::ConnectionTimeout
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else if err.is_decode() || err.is_body() {
        TransportError::Protocol(err.to_string())
    } else {
        TransportError::Http(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Patch => self.client.patch(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        let builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::File { field, path } => {
                let form = reqwest::blocking::multipart::Form::new().file(field.clone(), path)?;
                builder.multipart(form)
            }
        };

        let response = builder.send().map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(classify)?;
        Ok(HttpResponse { status, body })
    }
}

/// Mock transport for testing
///
/// Responses are queued per method and path (query included). The last
/// queued response for a route keeps being returned once the others are
/// used up. Unknown routes answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
    unreachable: Mutex<bool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a route
    pub fn on(&self, method: Method, path: &str, response: HttpResponse) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Fail every request with a connection error
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    /// Requests seen so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests seen for a method and path
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path() == path)
            .collect()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if *self.unreachable.lock().unwrap() {
            return Err(TransportError::ConnectionFailed(format!(
                "{}: connection refused",
                request.url
            )));
        }

        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(&(request.method, request.path().to_string())) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| {
            HttpResponse::json_body(404, serde_json::json!({ "errors": ["Not found"] }))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_of() {
        assert_eq!(path_of("http://jm:8081/jobs/abc?mode=cancel"), "/jobs/abc?mode=cancel");
        assert_eq!(path_of("http://jm:8081"), "/");
        assert_eq!(path_of("/overview"), "/overview");
    }

    #[test]
    fn test_mock_routes_and_sticky_last() {
        let transport = MockTransport::new();
        transport
            .on(Method::Get, "/overview", HttpResponse::new(503, ""))
            .on(Method::Get, "/overview", HttpResponse::json_body(200, json!({"taskmanagers": 1})));

        let request = HttpRequest::get("http://jm:8081/overview");
        assert_eq!(transport.execute(&request).unwrap().status, 503);
        assert_eq!(transport.execute(&request).unwrap().status, 200);
        assert_eq!(transport.execute(&request).unwrap().status, 200);
        assert_eq!(transport.requests_to(Method::Get, "/overview").len(), 3);
    }

    #[test]
    fn test_mock_unknown_route() {
        let transport = MockTransport::new();
        let response = transport.execute(&HttpRequest::get("http://jm/jobs")).unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[test]
    fn test_mock_unreachable() {
        let transport = MockTransport::new();
        transport.set_unreachable(true);
        let err = transport.execute(&HttpRequest::get("http://jm/overview")).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }

    #[test]
    fn test_response_json() {
        let response = HttpResponse::json_body(200, json!({"jobid": "abcd"}));
        let value: Value = response.json().unwrap();
        assert_eq!(value["jobid"], "abcd");

        let empty = HttpResponse::new(202, "");
        assert_eq!(empty.json::<Value>().unwrap(), Value::Null);
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(5)).is_ok());
    }
}
