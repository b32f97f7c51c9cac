//! Upgrader Core - Headless library for GitHub-driven module upgrades.
//!
//! This crate checks a set of module repositories for new GitHub releases,
//! resolves the downloadable zip artifact for each, and stages it for an
//! external archive handler — while a per-endpoint circuit breaker and a
//! 24-hour response cache protect the host process from a slow or failing
//! upstream API.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use upgrader_core::{
//!     RepositoryRef, StaticRepositoryProvider, UpgradeManager, UpgradeSettings,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> upgrader_core::Result<()> {
//!     let settings = UpgradeSettings::new("/var/cache/shop", "My Shop");
//!     let provider = Arc::new(StaticRepositoryProvider::new(vec![
//!         RepositoryRef::new("mymodule", "PrestaEdit/mymodule"),
//!     ]));
//!
//!     let manager = UpgradeManager::new(settings, provider, my_archive_handler())?;
//!
//!     // Resolve the latest releases and persist the listing snapshot
//!     let modules = manager.resolve_all().await?;
//!     println!("{} modules have pending upgrades", modules.len());
//!
//!     // Later, fetch one artifact and hand it to the archive handler
//!     manager.download("mymodule").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod network;
pub mod resolver;
pub mod snapshot;

// Re-export commonly used types
pub use cache::{CachedResponse, ResponseCache, ResponseStore};
pub use config::{NetworkConfig, PathsConfig, UpgradeSettings};
pub use error::{Result, UpgradeError};
pub use manager::{
    ArchiveHandler, RepositoryProvider, StaticRepositoryProvider, UpgradeManager,
};
pub use models::{ChangeLog, GitHubAsset, GitHubRelease, ModuleRelease, RepositoryRef};
pub use network::{
    BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitState, HttpClient,
    HttpResponse, ReleaseFetch, ReleaseFetcher,
};
