//! HTTP client abstraction layer for upstream calls
//!
//! Everything that leaves the process (the OAuth token exchange and the
//! metadata API) goes through [`HttpClient`]. Keeping it behind a trait lets
//! the token cache and rate limiter be exercised with scripted responses in
//! tests, without a real network.
//!
//! Unlike a plain `reqwest` call, a non-2xx status is *not* an error at this
//! layer: the response comes back with its status and headers so the rate
//! limiter can read `Ratelimit-*` and `Retry-After` before deciding what to
//! surface.
//!
//! # Example Usage:
//! ``
//! use crate::http::{HttpClient, DefaultHttpClient};
//!
//! let http: Arc<dyn HttpClient> = Arc::new(DefaultHttpClient::new(Duration::from_secs(10))?);
//! let resp = http.get(url, headers).await?;
//! if resp.is_success() { /* decode resp.body */ }
//! ``

use std::time::Duration;
use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use reqwest;
use crate::Error;

/// Status, headers and raw body of one upstream response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Header value as a trimmed string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    }
}

/// A generic trait for making HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post(
        &self,
        url: String,
        headers: Vec<(String, String)>,
        body: String,
    ) -> Result<HttpResponse, Error>;
    async fn get(&self, url: String, headers: Vec<(String, String)>) -> Result<HttpResponse, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    /// `timeout` is a hard per-request limit enforced by reqwest.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn finish(request: reqwest::RequestBuilder) -> Result<HttpResponse, Error> {
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(HttpResponse { status, headers, body })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn post(
        &self,
        url: String,
        headers: Vec<(String, String)>,
        body: String,
    ) -> Result<HttpResponse, Error> {
        let mut request = self.client.post(&url).body(body);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        Self::finish(request).await
    }

    async fn get(&self, url: String, headers: Vec<(String, String)>) -> Result<HttpResponse, Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        Self::finish(request).await
    }
}
