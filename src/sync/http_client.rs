//! HTTP client with per-call timeouts
//!
//! Every request carries its own deadline, so an expired call only fails
//! that call. A non-success status is always an error and its body is never
//! read.

use bytes::Bytes;
use reqwest::{header::AUTHORIZATION, multipart::Form, Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::SyncError;

/// HTTP client issuing single requests with a bounded timeout
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TimedHttpClient {
    client: Client,
    bearer: Option<String>,
}

impl TimedHttpClient {
    /// Create a client without authorization
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(concat!("flowsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client))
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            bearer: None,
        }
    }

    /// Clone of this client that sends `Authorization: Bearer <token>`
    pub fn with_bearer(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            bearer: Some(token.into()),
        }
    }

    /// GET and decode the body as JSON
    pub async fn get_json(&self, url: Url, timeout: Duration) -> Result<Value, SyncError> {
        let body = self.get_bytes(url, timeout).await?;
        serde_json::from_slice(&body).map_err(|e| SyncError::InvalidData(e.to_string()))
    }

    /// GET and return the body as UTF-8 text
    pub async fn get_text(&self, url: Url, timeout: Duration) -> Result<String, SyncError> {
        let body = self.get_bytes(url, timeout).await?;
        String::from_utf8(body.to_vec()).map_err(|e| SyncError::InvalidData(e.to_string()))
    }

    /// GET and return the raw body
    pub async fn get_bytes(&self, url: Url, timeout: Duration) -> Result<Bytes, SyncError> {
        let request = self.request(Method::GET, url.clone(), timeout);
        self.send(Method::GET, &url, request).await
    }

    /// POST a JSON body and return the raw response body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
        timeout: Duration,
    ) -> Result<Bytes, SyncError> {
        let request = self.request(Method::POST, url.clone(), timeout).json(body);
        self.send(Method::POST, &url, request).await
    }

    /// POST a multipart form and return the raw response body
    pub async fn post_multipart(
        &self,
        url: Url,
        form: Form,
        timeout: Duration,
    ) -> Result<Bytes, SyncError> {
        let request = self.request(Method::POST, url.clone(), timeout).multipart(form);
        self.send(Method::POST, &url, request).await
    }

    fn request(&self, method: Method, url: Url, timeout: Duration) -> RequestBuilder {
        let builder = self.client.request(method, url).timeout(timeout);
        match &self.bearer {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<Bytes, SyncError> {
        debug!(method = %method, url = %url, "Sending HTTP request");

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                reason: format!(
                    "{} {} {}",
                    method,
                    url,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(method = %method, url = %url, body_size = body.len(), "Received response");
        Ok(body)
    }
}

/// Parse a configured URL into a [`Url`]
pub fn parse_url(raw: &str) -> Result<Url, SyncError> {
    Url::parse(raw).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn map_reqwest_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::NetworkTimeout
    } else if e.is_connect() {
        SyncError::ConnectionRefused
    } else {
        SyncError::Network(e.to_string())
    }
}
