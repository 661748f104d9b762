//! `reqwest`-backed HTTP collaborator.
//!
//! Modules only depend on the [`HttpClient`] trait; this adapter is what an
//! application plugs in for real network access.

use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method as ReqwestMethod};
use revux_core::environment::{HttpClient, HttpFuture};
use revux_core::http::{HttpError, HttpRequest, HttpResponse, Method};
use serde_json::Value;
use std::collections::BTreeMap;

/// HTTP client backed by [`reqwest`]
///
/// Relative URLs are resolved against [`HttpConfig::base_url`]. Responses
/// are decoded as JSON; an empty body decodes to `null` and a non-JSON body
/// to a JSON string.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    config: HttpConfig,
}

impl ReqwestHttpClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] if a default header is invalid or the
    /// TLS backend cannot be initialized.
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let headers = header_map(&config.headers)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Wrap an already configured [`Client`]
    #[must_use]
    pub const fn with_client(client: Client, config: HttpConfig) -> Self {
        Self { client, config }
    }

    /// The configuration in use
    #[must_use]
    pub const fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = self.config.resolve(&request.url);
        let mut builder = self
            .client
            .request(method(request.method), &url)
            .headers(header_map(&request.headers)?);

        if let Some(query) = &request.query {
            builder = builder.query(&query_pairs(query));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!(method = %request.method, url = %url, "Sending HTTP request");

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<BTreeMap<_, _>>();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        let data = decode_body(&bytes);

        if status.is_success() {
            Ok(HttpResponse {
                status: status.as_u16(),
                headers,
                data,
            })
        } else {
            Err(HttpError::Status {
                status: status.as_u16(),
                body: (!data.is_null()).then_some(data),
            })
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
        Box::pin(self.send(request))
    }
}

const fn method(method: Method) -> ReqwestMethod {
    match method {
        Method::Get => ReqwestMethod::GET,
        Method::Post => ReqwestMethod::POST,
        Method::Put => ReqwestMethod::PUT,
        Method::Patch => ReqwestMethod::PATCH,
        Method::Delete => ReqwestMethod::DELETE,
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::Transport(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::Transport(format!("invalid header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Flatten a JSON object into query pairs; other shapes send no query
fn query_pairs(query: &Value) -> Vec<(String, String)> {
    let Value::Object(fields) = query else {
        return Vec::new();
    };
    fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
