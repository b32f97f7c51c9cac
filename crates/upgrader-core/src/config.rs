//! Centralized configuration for the upgrader library.
//!
//! Constant holders for network behavior and on-disk layout, plus the
//! runtime settings handed in by the host application.

use std::path::PathBuf;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    /// Consecutive primary failures before a breaker opens.
    pub const FAILURE_THRESHOLD: u32 = 2;
    /// Time an open breaker waits before the next recovery probe.
    pub const RECOVERY_TIMEOUT: Duration = Duration::from_secs(86_400);
    /// Overall budget for a breaker-gated primary call.
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(3);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_REDIRECTS: usize = 5;
    pub const RESPONSE_CACHE_TTL: Duration = Duration::from_secs(86_400);
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_API_VERSION: &'static str = "2022-11-28";
    pub const USER_AGENT: &'static str = "PrestaShop-ModuleAutoUpgrade";
}

/// Shared directory and path configurations.
pub struct PathsConfig;

impl PathsConfig {
    pub const CACHE_SUBDIR: &'static str = "github-upgrade-manager";
    pub const RESPONSES_DIR_NAME: &'static str = "responses";
    pub const DOWNLOADS_DIR_NAME: &'static str = "downloads";
}

/// Runtime settings for one upgrader instance.
///
/// `tenant` identifies the shop the snapshot belongs to; its hash becomes
/// the snapshot filename so that multi-shop hosts keep separate listings.
#[derive(Debug, Clone)]
pub struct UpgradeSettings {
    /// Root cache directory supplied by the host.
    pub cache_dir: PathBuf,
    /// Shop/tenant identity used to derive the snapshot path.
    pub tenant: String,
    /// Explicit bearer token; `None` falls back to the dotenv file.
    pub github_token: Option<String>,
    /// Optional dotenv file consulted for `GITHUB_TOKEN`.
    pub env_file: Option<PathBuf>,
    /// Surface transport failures instead of degrading to empty results.
    pub dev_mode: bool,
}

impl UpgradeSettings {
    pub fn new(cache_dir: impl Into<PathBuf>, tenant: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            tenant: tenant.into(),
            github_token: None,
            env_file: None,
            dev_mode: false,
        }
    }

    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Directory holding the module-list snapshot.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.cache_dir.join(PathsConfig::CACHE_SUBDIR)
    }

    /// Directory holding cached upstream responses.
    pub fn responses_dir(&self) -> PathBuf {
        self.snapshot_dir().join(PathsConfig::RESPONSES_DIR_NAME)
    }

    /// Directory where downloaded archives are staged for the handler.
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join(PathsConfig::DOWNLOADS_DIR_NAME)
    }
}
