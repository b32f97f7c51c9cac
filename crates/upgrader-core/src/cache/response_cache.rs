//! Two-tier response cache: in-memory TTL cache over a disk tier.
//!
//! The disk tier keeps one JSON file per key (filename is the sha256 of the
//! URL) so entries survive process restarts; the memory tier avoids
//! re-reading the file during a resolution pass. Expired or unreadable
//! entries read as absent — they are never proactively evicted.

use crate::cache::store::{CachedResponse, ResponseStore};
use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const MEMORY_CAPACITY: u64 = 64;

pub struct ResponseCache {
    memory: Cache<String, CachedResponse>,
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self {
            memory: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MEMORY_CAPACITY)
                .build(),
            dir,
            ttl,
        }
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{}.json", digest))
    }

    fn get_disk(&self, key: &str) -> Option<CachedResponse> {
        let path = self.disk_path(key);
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to parse cached response {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read cached response {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set_disk(&self, key: &str, entry: &CachedResponse) {
        let path = self.disk_path(key);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create cache directory {}: {}", parent.display(), e);
                return;
            }
        }

        match serde_json::to_string(entry) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&path, contents) {
                    warn!("Failed to write cached response {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize cached response for {}: {}", key, e),
        }
    }
}

impl ResponseStore for ResponseCache {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        if let Some(entry) = self.memory.get(&key.to_string()) {
            debug!("response cache hit (memory) for {}", key);
            return Some(entry);
        }

        let entry = self.get_disk(key)?;
        if !entry.is_fresh(self.ttl) {
            debug!("response cache entry expired for {}", key);
            return None;
        }

        debug!("response cache hit (disk) for {}", key);
        self.memory.insert(key.to_string(), entry.clone());
        Some(entry)
    }

    fn put(&self, key: &str, response: CachedResponse) {
        self.memory.insert(key.to_string(), response.clone());
        self.set_disk(key, &response);
    }
}
