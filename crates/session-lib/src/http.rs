// ============================
// crates/session-lib/src/http.rs
// ============================
//! Generic request/response boundary to the helpdesk REST API.
use async_trait::async_trait;
use reqwest::{header::HeaderValue, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{fmt, time::Duration};

use crate::error::SessionError;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One call to the API, relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, SessionError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Value of a header, matched case-insensitively
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Any response the server produced, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Value,
}

impl ApiResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into `SessionError::Http`
    pub fn error_for_status(self) -> Result<Self, SessionError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self
            .data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| match &self.data {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            });
        Err(SessionError::Http {
            status: self.status,
            message,
        })
    }

    /// Decode the body, reporting shape mismatches against `path`
    pub fn decode<T: DeserializeOwned>(self, path: &str) -> Result<T, SessionError> {
        serde_json::from_value(self.data).map_err(|e| SessionError::MalformedResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Transport used by the credential service.
///
/// Implementations return `Err(SessionError::Transport)` only when no
/// response was received. Every received response, whatever its status,
/// is returned as `Ok`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, req: ApiRequest) -> Result<ApiResponse, SessionError>;
}

/// `reqwest` backed client rooted at the API base URL
#[derive(Clone)]
pub struct ReqwestClient {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, SessionError> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| SessionError::Config(format!("invalid API base URL {base}: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    fn url_for(&self, path: &str) -> Result<Url, SessionError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| SessionError::Config(format!("invalid request path {path}: {e}")))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    #[tracing::instrument(skip(self, req), fields(method = %req.method, path = %req.path))]
    async fn request(&self, req: ApiRequest) -> Result<ApiResponse, SessionError> {
        let url = self.url_for(&req.path)?;
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        for (name, value) in &req.headers {
            let value = HeaderValue::from_str(value)
                .map_err(|e| SessionError::Transport(format!("invalid header {name}: {e}")))?;
            builder = builder.header(name.as_str(), value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        // Error pages are not always JSON; keep them as text
        let data = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        tracing::debug!(status, "response received");

        Ok(ApiResponse { status, data })
    }
}
