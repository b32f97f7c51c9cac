//! Network layer: HTTP transport, resilience, and release fetching.
//!
//! This module provides:
//! - Circuit breaker + per-endpoint registry gating upstream calls
//! - HTTP client with the upstream transport settings applied
//! - Token resolution and GitHub header assembly
//! - The release fetcher used as both breaker paths

mod auth;
mod circuit_breaker;
mod client;
mod fetcher;

pub use auth::{github_headers, resolve_token};
pub use circuit_breaker::{BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{extract_domain, HttpClient, HttpResponse};
pub use fetcher::{ReleaseFetch, ReleaseFetcher};
