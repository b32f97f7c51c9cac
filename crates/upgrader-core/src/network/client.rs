//! HTTP client wrapper around reqwest.
//!
//! Transport-level failures (connect, TLS, timeout) are errors; HTTP error
//! statuses are data — the caller inspects `HttpResponse::status` and
//! decides what a 404 or 500 means for its layer.

use crate::cache::CachedResponse;
use crate::config::NetworkConfig;
use crate::error::{Result, UpgradeError};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Rebuild a response from a cache entry. Indistinguishable from the
    /// live 200 it was stored from.
    pub fn from_cached(entry: &CachedResponse) -> Self {
        Self {
            status: 200,
            headers: entry.headers.clone(),
            body: entry.body.clone().into_bytes(),
        }
    }
}

/// HTTP client with the upstream-facing transport settings applied.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(NetworkConfig::CONNECT_TIMEOUT)
            .timeout(NetworkConfig::CALL_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(NetworkConfig::MAX_REDIRECTS))
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| UpgradeError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Issue a GET with the given headers, buffering the whole body.
    pub async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpgradeError::transport(url, e))?;

        let status = response.status().as_u16();
        let mut collected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            collected
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpgradeError::transport(url, e))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers: collected,
            body,
        })
    }
}

/// Extract the host of a URL, for per-endpoint diagnostics.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}
