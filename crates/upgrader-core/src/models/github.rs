//! GitHub release payload types.
//!
//! Deserialized from the `releases/latest` endpoint; ephemeral, discarded
//! once a release has been resolved. Unknown payload fields are ignored.

use serde::{Deserialize, Serialize};

/// GitHub release asset information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    /// Public browser download URL; no auth required for public repos.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// Asset API URL; requires an authorization header even for public repos.
    #[serde(rename = "url")]
    pub api_url: String,
}

/// GitHub release information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}
