//! Native platform implementations
//!
//! Implements the core platform traits for a regular process:
//! - HttpClient: reqwest
//! - Clock: std::time::SystemTime
//! - Environment: process environment variables

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use gtfo_core::error::{ApiError, Result};
use gtfo_core::platform::{Clock, Environment, HttpClient, HttpResponse};

/// Timeout for every outbound request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-based HTTP client
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::internal(format!("building HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        mut builder: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::upstream_error(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::upstream_error(format!("failed to read response: {}", e)))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(self.client.get(url), headers).await
    }

    async fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse> {
        self.send(self.client.post(url).body(body.to_vec()), headers)
            .await
    }

    async fn delete(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(self.client.delete(url), headers).await
    }
}

/// System clock using std::time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}

/// Process environment; secrets are injected as environment variables
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| ApiError::internal(format!("environment variable '{}' not set", name)))
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        std::env::var(name)
            .map_err(|_| ApiError::internal(format!("secret '{}' not found in environment", name)))
    }
}
