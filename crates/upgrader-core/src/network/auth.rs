//! GitHub token resolution and request header assembly.
//!
//! The token is resolved once per fetcher: explicit configuration wins,
//! then a dotenv file, then empty. An empty token still produces an
//! `Authorization` header — GitHub treats it as an unauthenticated call
//! with degraded rate limits, which is not an error.

use crate::config::{NetworkConfig, UpgradeSettings};
use tracing::debug;

const GITHUB_TOKEN_KEY: &str = "GITHUB_TOKEN";

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_OCTET_STREAM: &str = "application/octet-stream";

/// Resolve the bearer token for upstream calls.
pub fn resolve_token(settings: &UpgradeSettings) -> String {
    if let Some(token) = settings.github_token.as_deref() {
        let token = token.trim();
        if !token.is_empty() {
            return token.to_string();
        }
    }

    if let Some(path) = settings.env_file.as_deref() {
        if path.is_file() {
            match dotenvy::from_path_iter(path) {
                Ok(vars) => {
                    for item in vars {
                        if let Ok((key, value)) = item {
                            if key == GITHUB_TOKEN_KEY && !value.trim().is_empty() {
                                debug!("GitHub token resolved from {}", path.display());
                                return value.trim().to_string();
                            }
                        }
                    }
                }
                Err(e) => debug!("Failed to parse env file {}: {}", path.display(), e),
            }
        }
    }

    String::new()
}

/// Build the header set for an upstream GitHub call.
///
/// `download_mode` switches the `Accept` header from the JSON metadata
/// type to octet-stream for binary asset fetches.
pub fn github_headers(token: &str, download_mode: bool) -> Vec<(String, String)> {
    vec![
        ("Authorization".to_string(), format!("Bearer {}", token)),
        (
            "X-GitHub-Api-Version".to_string(),
            NetworkConfig::GITHUB_API_VERSION.to_string(),
        ),
        (
            "Accept".to_string(),
            if download_mode { ACCEPT_OCTET_STREAM } else { ACCEPT_JSON }.to_string(),
        ),
    ]
}
