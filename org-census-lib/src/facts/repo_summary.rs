use super::hosting::records::{Commit, Contributor, Issue, PullRequest};
use super::registry::{PackageInfo, PackageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The most recent human touch of some kind on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub date: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub url: String,
}

impl From<&Commit> for Interaction {
    fn from(commit: &Commit) -> Self {
        Self {
            date: commit.committed_at(),
            author: commit.author_name().map(ToString::to_string),
            url: commit.html_url.clone(),
        }
    }
}

impl From<&PullRequest> for Interaction {
    fn from(pr: &PullRequest) -> Self {
        Self {
            date: pr.updated_at,
            author: pr.author().map(ToString::to_string),
            url: pr.html_url.clone(),
        }
    }
}

impl From<&Issue> for Interaction {
    fn from(issue: &Issue) -> Self {
        Self {
            date: issue.updated_at,
            author: issue.author().map(ToString::to_string),
            url: issue.html_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastInteractions {
    pub commit: Option<Interaction>,
    pub pr: Option<Interaction>,
    pub issue: Option<Interaction>,
}

/// Human activity over the trailing year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub issues_in_past_year: u64,
    pub prs_in_past_year: u64,
}

/// Everything we report about one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub owner: String,
    pub repo: String,
    pub fork: bool,
    pub contributors: Vec<Contributor>,

    /// Declared package name to what the registry says about it.
    pub package_summary: BTreeMap<String, PackageInfo>,

    pub last_interactions: LastInteractions,

    #[serde(default)]
    pub activity: ActivityCounts,
}

impl RepoSummary {
    /// The published package with the most weekly downloads.
    ///
    /// Packages without download statistics count as zero. Ties go to the
    /// alphabetically first name.
    #[must_use]
    pub fn most_used_package(&self) -> Option<(&str, &PackageInfo)> {
        self.package_summary
            .iter()
            .filter(|(_, info)| info.status == PackageStatus::Found)
            .fold(None, |best: Option<(&String, &PackageInfo)>, candidate| match best {
                Some(current) if current.1.download_count.unwrap_or(0) >= candidate.1.download_count.unwrap_or(0) => {
                    Some(current)
                }
                _ => Some(candidate),
            })
            .map(|(name, info)| (name.as_str(), info))
    }
}
