//! UpgradeManager — orchestrates release resolution, snapshot persistence,
//! and artifact download/handoff.
//!
//! One manager instance owns the per-endpoint breaker registry for its
//! lifetime; repositories are resolved one at a time in provider order, and
//! a failing repository never blocks the others.

use crate::config::{NetworkConfig, UpgradeSettings};
use crate::error::{Result, UpgradeError};
use crate::models::{GitHubRelease, ModuleRelease, RepositoryRef};
use crate::network::{BreakerRegistry, ReleaseFetch, ReleaseFetcher};
use crate::{resolver, snapshot};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces the set of module repositories to check for upgrades.
///
/// Iteration order must be deterministic so that snapshots are
/// reproducible across passes.
pub trait RepositoryProvider: Send + Sync {
    fn repositories(&self) -> Vec<RepositoryRef>;
}

/// A fixed repository list, for hosts that register modules up front.
pub struct StaticRepositoryProvider {
    repositories: Vec<RepositoryRef>,
}

impl StaticRepositoryProvider {
    pub fn new(repositories: Vec<RepositoryRef>) -> Self {
        Self { repositories }
    }
}

impl RepositoryProvider for StaticRepositoryProvider {
    fn repositories(&self) -> Vec<RepositoryRef> {
        self.repositories.clone()
    }
}

/// Consumes a staged archive and performs extraction/install.
///
/// Failures from this stage are not retried by the core; its only
/// obligation afterwards is to remove the staged file.
#[async_trait]
pub trait ArchiveHandler: Send + Sync {
    async fn handle(&self, archive: &Path) -> Result<()>;
}

/// Orchestrator for the release-resolution and fetch pipeline.
pub struct UpgradeManager {
    settings: UpgradeSettings,
    fetcher: Arc<dyn ReleaseFetch>,
    breakers: BreakerRegistry,
    provider: Arc<dyn RepositoryProvider>,
    handler: Arc<dyn ArchiveHandler>,
}

impl UpgradeManager {
    pub fn new(
        settings: UpgradeSettings,
        provider: Arc<dyn RepositoryProvider>,
        handler: Arc<dyn ArchiveHandler>,
    ) -> Result<Self> {
        let fetcher = Arc::new(ReleaseFetcher::new(&settings)?);
        Ok(Self::with_fetcher(settings, fetcher, provider, handler))
    }

    /// Build a manager over a custom fetch implementation.
    pub fn with_fetcher(
        settings: UpgradeSettings,
        fetcher: Arc<dyn ReleaseFetch>,
        provider: Arc<dyn RepositoryProvider>,
        handler: Arc<dyn ArchiveHandler>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            breakers: BreakerRegistry::new(),
            provider,
            handler,
        }
    }

    fn latest_release_url(repository_id: &str) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            NetworkConfig::GITHUB_API_BASE,
            repository_id
        )
    }

    /// Resolve the latest release for every configured repository and
    /// persist the resulting listing.
    ///
    /// Repositories that fail to resolve — transport trouble, unusable
    /// payload, no matching asset — are skipped, so the output is never
    /// longer than the provider's list. The snapshot is overwritten even
    /// when the listing comes out empty.
    pub async fn resolve_all(&self) -> Result<Vec<ModuleRelease>> {
        let mut modules = Vec::new();

        for repository in self.provider.repositories() {
            match self.resolve_one(&repository).await {
                Ok(Some(release)) => modules.push(release),
                Ok(None) => {
                    debug!("no pending upgrade for {}", repository.module_name);
                }
                Err(e) => {
                    if self.settings.dev_mode {
                        return Err(e);
                    }
                    warn!(
                        "skipping {} ({}): {}",
                        repository.module_name, repository.repository_id, e
                    );
                }
            }
        }

        let path = snapshot::snapshot_path(&self.settings);
        snapshot::write_snapshot(&path, &modules)?;
        info!("persisted module listing with {} entries", modules.len());

        Ok(modules)
    }

    async fn resolve_one(&self, repository: &RepositoryRef) -> Result<Option<ModuleRelease>> {
        let url = Self::latest_release_url(&repository.repository_id);

        let primary_fetcher = Arc::clone(&self.fetcher);
        let primary_url = url.clone();
        let fallback_fetcher = Arc::clone(&self.fetcher);
        let fallback_url = url.clone();

        let response = self
            .breakers
            .call(
                &url,
                move || async move { primary_fetcher.fetch_release(&primary_url).await },
                move || async move { fallback_fetcher.fetch_release_direct(&fallback_url).await },
            )
            .await?;

        let release: GitHubRelease = match serde_json::from_slice(&response.body) {
            Ok(release) => release,
            Err(e) => {
                debug!(
                    "unusable release payload for {}: {}",
                    repository.repository_id, e
                );
                return Ok(None);
            }
        };

        Ok(resolver::resolve_release(&release, &repository.module_name))
    }

    /// Return the last persisted listing without any network activity.
    pub fn read_snapshot(&self) -> Result<Vec<ModuleRelease>> {
        snapshot::read_snapshot(&snapshot::snapshot_path(&self.settings))
    }

    /// Download a module's archive and hand it to the archive handler.
    ///
    /// A module with no snapshot entry is a no-op. The staged file is
    /// removed whether or not the handler succeeds.
    pub async fn download(&self, module_name: &str) -> Result<()> {
        let modules = self.read_snapshot()?;
        let Some(module) = modules.into_iter().find(|m| m.name == module_name) else {
            debug!("no snapshot entry for {}, nothing to download", module_name);
            return Ok(());
        };

        let body = self.fetch_module_archive(&module).await?;

        let staging = self
            .settings
            .downloads_dir()
            .join(format!("{}.zip", module.name));
        if let Some(parent) = staging.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| UpgradeError::io_with_path(e, parent))?;
            }
        }
        std::fs::write(&staging, &body).map_err(|e| UpgradeError::io_with_path(e, &staging))?;
        info!(
            "staged {} bytes for {} at {}",
            body.len(),
            module.name,
            staging.display()
        );

        let outcome = self.handler.handle(&staging).await;

        if let Err(e) = std::fs::remove_file(&staging) {
            warn!("failed to remove staged archive {}: {}", staging.display(), e);
        }

        outcome
    }

    /// Fetch the archive, retrying once via the asset API URL when the
    /// public download URL yields nothing usable.
    async fn fetch_module_archive(&self, module: &ModuleRelease) -> Result<Vec<u8>> {
        match self.fetcher.fetch_archive(&module.archive_url).await {
            Ok(response) if response.is_success() && usable_archive_body(&response.body) => {
                return Ok(response.body);
            }
            Ok(response) => {
                debug!(
                    "archive fetch for {} unusable (status {}), retrying via asset URL",
                    module.archive_url, response.status
                );
            }
            Err(e) => {
                debug!(
                    "archive fetch for {} failed ({}), retrying via asset URL",
                    module.archive_url, e
                );
            }
        }

        let response = self
            .fetcher
            .fetch_asset(&module.asset_url)
            .await
            .map_err(|e| UpgradeError::DownloadFailed {
                url: module.asset_url.clone(),
                message: e.to_string(),
            })?;

        if response.is_success() && usable_archive_body(&response.body) {
            Ok(response.body)
        } else {
            Err(UpgradeError::DownloadFailed {
                url: module.asset_url.clone(),
                message: format!("asset endpoint returned no archive (status {})", response.status),
            })
        }
    }
}

/// GitHub serves a literal `Not Found` body for missing public downloads.
fn usable_archive_body(body: &[u8]) -> bool {
    !body.is_empty() && body != b"Not Found"
}
