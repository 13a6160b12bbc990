use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether a package name resolves on the public registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PackageStatus {
    Found,
    NotFound,
    /// The package page redirects to a login, meaning it lives in a private scope.
    PrivateScope,
}

/// What we know about one package declared by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub version: String,
    pub status: PackageStatus,

    /// Downloads in the last week, only looked up for packages that were found.
    pub download_count: Option<u64>,

    pub url: String,
}
