//! HTTP transport.
//!
//! The [`Transport`] trait is the seam between the operation protocol and the
//! network. [`HttpTransport`] is the reqwest implementation used by the CLI;
//! tests substitute scripted transports.
use crate::auth::{AuthError, AuthToken};
use crate::request::{CLIENT_REQUEST_ID, RequestDescriptor};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS, TLS or body read failures
    #[error("network request failed: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("credentials: {0}")]
    Auth(#[from] AuthError),
}

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl HttpRequest {
    /// A polling GET.
    pub fn get(url: Url) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            method: Method::GET,
            url,
            headers,
            body: None,
        }
    }
}

impl From<RequestDescriptor> for HttpRequest {
    fn from(desc: RequestDescriptor) -> Self {
        Self {
            method: desc.method,
            url: desc.url,
            headers: desc.headers,
            body: desc.body,
        }
    }
}

/// A received HTTP response with its body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// The body as JSON, or `None` when empty or not JSON.
    pub fn json(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single HTTP request and returns the complete response.
///
/// Implementations do not interpret status codes and do not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// reqwest backed transport with optional bearer authentication.
pub struct HttpTransport {
    client: Client,
    token: Option<AuthToken>,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration, token: Option<AuthToken>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("armctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client, token })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut headers = request.headers;
        if !headers.contains_key(CLIENT_REQUEST_ID)
            && let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string())
        {
            headers.insert(CLIENT_REQUEST_ID, id);
        }
        debug!(
            method = %request.method,
            url = %request.url,
            request_id = ?headers.get(CLIENT_REQUEST_ID),
            "sending request"
        );

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);

        if let Some(token) = &self.token {
            let secret = token.resolve().await?;
            builder = builder.bearer_auth(secret.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?
            .to_vec();

        debug!(status = status.as_u16(), bytes = body.len(), "received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
