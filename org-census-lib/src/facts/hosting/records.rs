//! Typed views of the GitHub REST API payloads we consume.
//!
//! Only the fields we actually use are declared; everything else in the payload is
//! ignored. Every record is also `Serialize` so it can be stored in the cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Contributor {
    pub login: String,
    pub html_url: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// The account that opened an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GitSignature {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitDetails {
    pub author: Option<GitSignature>,
    pub committer: Option<GitSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetails,
}

impl Commit {
    /// Name recorded as the commit's author, if any.
    #[must_use]
    pub fn author_name(&self) -> Option<&str> {
        self.commit.author.as_ref().and_then(|a| a.name.as_deref())
    }

    #[must_use]
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.commit.committer.as_ref().and_then(|c| c.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub user: Option<Actor>,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl PullRequest {
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// Present on items of the issues endpoint that are really pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequestMarker {
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub user: Option<Actor>,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub pull_request: Option<PullRequestMarker>,
}

impl Issue {
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }

    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// One hit of a code search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodeSearchHit {
    pub path: String,
}

/// Envelope returned by the search endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchResults<T> {
    pub items: Vec<T>,
}

/// Metadata for a single file from the contents endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentEntry {
    pub download_url: Option<String>,
}
