//! Normalized release records and repository references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Changelog entries keyed by version.
pub type ChangeLog = BTreeMap<String, Vec<String>>;

/// A module and the GitHub repository it upgrades from.
///
/// Supplied by the host's repository provider; immutable for the duration
/// of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub module_name: String,
    /// `owner/repo` identifier on GitHub.
    pub repository_id: String,
}

impl RepositoryRef {
    pub fn new(module_name: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            repository_id: repository_id.into(),
        }
    }
}

/// A resolved module release, as persisted in the listing snapshot.
///
/// The serialized field names are part of the snapshot format consumed by
/// the host and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRelease {
    pub name: String,
    pub version_available: String,
    pub archive_url: String,
    pub asset_url: String,
    #[serde(rename = "changeLog")]
    pub change_log: Option<ChangeLog>,
}
