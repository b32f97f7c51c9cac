//! Release fetching: the breaker's primary and fallback paths.
//!
//! Both paths perform a real network GET; the difference is that the
//! primary path is fronted by the response cache (hits short-circuit the
//! network and 200 responses are stored), while the fallback path always
//! goes straight to the wire.

use crate::cache::{CachedResponse, ResponseCache, ResponseStore};
use crate::config::{NetworkConfig, UpgradeSettings};
use crate::error::Result;
use crate::network::auth;
use crate::network::client::{HttpClient, HttpResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Fetch operations needed by the upgrade pipeline.
///
/// A seam for tests and alternative transports; the production
/// implementation is [`ReleaseFetcher`].
#[async_trait]
pub trait ReleaseFetch: Send + Sync {
    /// Cached metadata fetch — the breaker's primary path.
    async fn fetch_release(&self, url: &str) -> Result<HttpResponse>;

    /// Uncached metadata fetch — the breaker's fallback path.
    async fn fetch_release_direct(&self, url: &str) -> Result<HttpResponse>;

    /// Plain archive fetch against a public browser-download URL.
    async fn fetch_archive(&self, url: &str) -> Result<HttpResponse>;

    /// Authenticated octet-stream fetch against an asset API URL.
    async fn fetch_asset(&self, url: &str) -> Result<HttpResponse>;
}

/// Production fetcher backed by reqwest and the response cache.
pub struct ReleaseFetcher {
    http: HttpClient,
    store: Arc<dyn ResponseStore>,
    token: String,
}

impl ReleaseFetcher {
    pub fn new(settings: &UpgradeSettings) -> Result<Self> {
        let store = Arc::new(ResponseCache::new(
            settings.responses_dir(),
            NetworkConfig::RESPONSE_CACHE_TTL,
        ));
        Self::with_store(settings, store)
    }

    /// Build a fetcher over a custom response store.
    pub fn with_store(settings: &UpgradeSettings, store: Arc<dyn ResponseStore>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            store,
            token: auth::resolve_token(settings),
        })
    }

    /// Store a response iff it is a 200; anything else is never cached.
    fn maybe_store(&self, url: &str, response: &HttpResponse) {
        if response.status == 200 {
            self.store.put(
                url,
                CachedResponse::new(response.headers.clone(), response.text().into_owned()),
            );
        }
    }
}

#[async_trait]
impl ReleaseFetch for ReleaseFetcher {
    async fn fetch_release(&self, url: &str) -> Result<HttpResponse> {
        if let Some(cached) = self.store.get(url) {
            debug!("serving {} from response cache", url);
            return Ok(HttpResponse::from_cached(&cached));
        }

        let response = self
            .http
            .get(url, &auth::github_headers(&self.token, false))
            .await?;
        self.maybe_store(url, &response);
        Ok(response)
    }

    async fn fetch_release_direct(&self, url: &str) -> Result<HttpResponse> {
        self.http
            .get(url, &auth::github_headers(&self.token, false))
            .await
    }

    async fn fetch_archive(&self, url: &str) -> Result<HttpResponse> {
        self.http.get(url, &[]).await
    }

    async fn fetch_asset(&self, url: &str) -> Result<HttpResponse> {
        self.http
            .get(url, &auth::github_headers(&self.token, true))
            .await
    }
}
