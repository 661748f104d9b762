//! Request descriptors and the HTTP collaborator contract types.
//!
//! An API action's request builder returns an [`ApiRequest`]: what to call
//! and how to track it. The dispatcher turns it into an [`HttpRequest`] for
//! the injected [`HttpClient`](crate::environment::HttpClient), which answers
//! with an [`HttpResponse`] or an [`HttpError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Extra transport options merged into the outgoing request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Additional headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout overriding the client default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Description of the HTTP call an API action performs
///
/// # Example
///
/// ```
/// use revux_core::http::{ApiRequest, Method};
/// use serde_json::json;
///
/// let request = ApiRequest::patch("/todos/7")
///     .with_params(json!({ "title": "y" }))
///     .key_by(7);
///
/// assert_eq!(request.method, Method::Patch);
/// assert_eq!(request.key_by.as_deref(), Some("7"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Target URL, absolute or relative to the client's base URL
    pub url: String,
    /// Query parameters for GET, body for everything else
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Extra transport options
    #[serde(default)]
    pub options: RequestOptions,
    /// Discriminator scoping the request status key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_by: Option<String>,
}

impl ApiRequest {
    /// A request with no parameters
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: None,
            options: RequestOptions::default(),
            key_by: None,
        }
    }

    /// A GET request
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// A POST request
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// A PUT request
    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// A PATCH request
    #[must_use]
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// A DELETE request
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Set the parameters
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Set a per-request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Track this request's status separately per discriminator
    #[must_use]
    pub fn key_by(mut self, discriminator: impl fmt::Display) -> Self {
        self.key_by = Some(discriminator.to_string());
        self
    }

    /// Assemble the transport request
    ///
    /// GET requests carry `params` as query parameters; every other method
    /// carries them as the body.
    #[must_use]
    pub fn to_http_request(&self) -> HttpRequest {
        let (query, body) = match self.method {
            Method::Get => (self.params.clone(), None),
            _ => (None, self.params.clone()),
        };
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            query,
            body,
            headers: self.options.headers.clone(),
            timeout: self.options.timeout,
        }
    }
}

/// The request handed to the HTTP collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Target URL
    pub url: String,
    /// Query parameters
    pub query: Option<Value>,
    /// JSON body
    pub body: Option<Value>,
    /// Extra headers
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

/// A successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Decoded body
    pub data: Value,
}

impl HttpResponse {
    /// A 200 response with the given body
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            data,
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Look up a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A failed HTTP call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    /// The server answered with a non-success status
    #[error("Request failed with status {status}")]
    Status {
        /// Status code
        status: u16,
        /// Decoded error body, when the server sent one
        body: Option<Value>,
    },

    /// No usable response (connection, timeout, decoding)
    #[error("Transport error: {0}")]
    Transport(String),
}

impl HttpError {
    /// Structured error body, if the failure carries one
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            Self::Transport(_) => None,
        }
    }

    /// Consume the error, returning its structured body
    #[must_use]
    pub fn into_body(self) -> Option<Value> {
        match self {
            Self::Status { body, .. } => body,
            Self::Transport(_) => None,
        }
    }

    /// Status code, if the server answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_sends_params_as_query() {
        let request = ApiRequest::get("/todos")
            .with_params(json!({ "page": 2 }))
            .to_http_request();
        assert_eq!(request.query, Some(json!({ "page": 2 })));
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_other_methods_send_params_as_body() {
        let request = ApiRequest::post("/todos")
            .with_params(json!({ "title": "x" }))
            .with_header("x-trace", "abc")
            .with_timeout(Duration::from_secs(2))
            .to_http_request();
        assert_eq!(request.query, None);
        assert_eq!(request.body, Some(json!({ "title": "x" })));
        assert_eq!(request.headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_error_body_accessors() {
        let err = HttpError::Status {
            status: 422,
            body: Some(json!({ "message": "bad id" })),
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.body(), Some(&json!({ "message": "bad id" })));

        let err = HttpError::Transport("connection reset".to_string());
        assert_eq!(err.body(), None);
        assert_eq!(err.into_body(), None);
    }

    #[test]
    fn test_response_header_lookup_ignores_case() {
        let response = HttpResponse::ok(json!([])).with_header("X-Total-Count", "6");
        assert_eq!(response.header("x-total-count"), Some("6"));
    }
}
