//! Release resolution: raw GitHub payload → normalized module release.
//!
//! A release is usable only if it carries a zip asset whose base filename
//! matches the module name exactly; everything else resolves to "no
//! compatible release", which is silence, not an error.

use crate::models::{ChangeLog, GitHubAsset, GitHubRelease, ModuleRelease};

const ZIP_CONTENT_TYPE: &str = "application/zip";
const FULL_CHANGELOG_MARKER: &str = "**Full Changelog**";

/// Resolve a raw release payload for a module.
///
/// Returns `None` when no asset satisfies the naming/content-type rule.
pub fn resolve_release(release: &GitHubRelease, module_name: &str) -> Option<ModuleRelease> {
    let version = normalize_tag(&release.tag_name);

    let (archive_url, asset_url) = match select_zip_asset(&release.assets, module_name) {
        Some(asset) => (asset.download_url.clone(), asset.api_url.clone()),
        None => (String::new(), String::new()),
    };

    if archive_url.is_empty() {
        return None;
    }

    let change_log = extract_changelog(release.body.as_deref().unwrap_or(""), &version);

    Some(ModuleRelease {
        name: module_name.to_string(),
        version_available: version,
        archive_url,
        asset_url,
        change_log,
    })
}

/// Strip a single leading `v`/`V` from a release tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag).to_string()
}

/// First asset that is a zip whose base filename equals the module name.
///
/// The same asset supplies both the public download URL and the API URL.
fn select_zip_asset<'a>(assets: &'a [GitHubAsset], module_name: &str) -> Option<&'a GitHubAsset> {
    assets.iter().find(|asset| {
        let base_name = asset.name.strip_suffix(".zip").unwrap_or(&asset.name);
        asset.content_type == ZIP_CONTENT_TYPE && base_name == module_name
    })
}

/// Extract changelog entries from a release body.
///
/// Bullet lines keep their text minus every `-` character; a
/// `**Full Changelog**` line loses its `**` markers and is appended once,
/// after all bullets, wherever it appeared in the body. An empty body
/// yields no changelog at all.
pub fn extract_changelog(body: &str, version: &str) -> Option<ChangeLog> {
    if body.is_empty() {
        return None;
    }

    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let mut entries = vec![String::new()];
    let mut full_changelog = String::new();

    for line in normalized.split('\n') {
        if line.starts_with('-') {
            entries.push(line.replace('-', ""));
        } else if line.starts_with(FULL_CHANGELOG_MARKER) {
            full_changelog = line.replace("**", "");
        }
    }

    if !full_changelog.is_empty() {
        entries.push(full_changelog);
    }

    let mut change_log = ChangeLog::new();
    change_log.insert(version.to_string(), entries);
    Some(change_log)
}
