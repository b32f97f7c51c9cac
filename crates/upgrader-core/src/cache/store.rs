//! Response store trait and cached entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A stored upstream response: headers, body and the moment it was cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    /// RFC 3339 timestamp of when the entry was stored.
    pub stored_at: String,
}

impl CachedResponse {
    pub fn new(headers: BTreeMap<String, Vec<String>>, body: String) -> Self {
        Self {
            headers,
            body,
            stored_at: Utc::now().to_rfc3339(),
        }
    }

    /// Whether the entry is still within its lifetime.
    ///
    /// An unparseable timestamp reads as stale.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match DateTime::parse_from_rfc3339(&self.stored_at) {
            Ok(stored) => {
                let age = Utc::now().signed_duration_since(stored);
                age.num_seconds() < ttl.as_secs() as i64
            }
            Err(_) => false,
        }
    }
}

/// Key/value store for upstream responses, keyed by exact request URL.
///
/// Expiry is the store's concern: a `get` on an expired key behaves as
/// absent. Implementations must be swappable for tests without any
/// network or disk dependency.
pub trait ResponseStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Store a response. Callers only invoke this for HTTP 200 responses;
    /// storage failures are not fatal to the request that produced them.
    fn put(&self, key: &str, response: CachedResponse);
}
