//! HTTP client abstraction for the remote voucher service.
//!
//! The voucher API client only needs "POST this JSON with these headers and
//! hand me back the status and raw body". Keeping that behind a trait lets the
//! classification logic be tested without a network, while the default
//! implementation wraps reqwest.
//!
//! # Example Usage:
//! ``
//! use voucherbot_core::http::{HttpClient, DefaultHttpClient};
//!
//! let http: Arc<dyn HttpClient> = Arc::new(DefaultHttpClient::new());
//! let resp = http.post_json(&url, &headers, &body, Duration::from_secs(30)).await?;
//! ``

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::Error;

/// Status and body of a completed request. The body is left unparsed; callers
/// decide what an unreadable body means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, Error>;
}

#[derive(Clone, Default)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, Error> {
        let mut request = self.client.post(url).timeout(timeout).json(body);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}
