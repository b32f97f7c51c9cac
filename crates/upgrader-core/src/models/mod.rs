//! Data types shared across the upgrade pipeline.

mod github;
mod release;

pub use github::{GitHubAsset, GitHubRelease};
pub use release::{ChangeLog, ModuleRelease, RepositoryRef};
