use super::client::{Client, ListShape};
use super::queries::RepoQueries;
use super::records::Repository;
use crate::Result;
use crate::facts::cache::Cache;
use crate::facts::cache_key::{CacheKey, Operation};
use chrono::{DateTime, Utc};
use ohno::EnrichableExt;

const LOG_TARGET: &str = "   hosting";

/// Public GitHub API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Entry point for GitHub lookups.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    cache: Cache,
    now: DateTime<Utc>,
}

impl Provider {
    pub fn new(github_token: Option<&str>, base_url: &str, cache: Cache, now: DateTime<Utc>) -> Result<Self> {
        if github_token.is_none() {
            log::warn!(target: LOG_TARGET, "No GitHub token provided, API requests will be heavily rate limited");
        }

        Ok(Self {
            client: Client::new(github_token, base_url)?,
            cache,
            now,
        })
    }

    /// Every repository owned by `org`.
    pub async fn repositories_for_org(&self, org: &str) -> Result<Vec<Repository>> {
        self.cache
            .get_or_compute(CacheKey::new(Operation::RepositoriesForOrg, [org]), || async {
                let url = self.client.endpoint(["orgs", org, "repos"], &[("per_page", "100")])?;
                let repos: Vec<Repository> = self.client.pages(url, ListShape::Array).collect_all().await?;
                log::info!(target: LOG_TARGET, "Found {} repositories in '{org}'", repos.len());
                Ok(repos)
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("listing repositories of '{org}'")))
    }

    /// Queries scoped to one repository.
    #[must_use]
    pub fn repo(&self, owner: &str, repo: &str) -> RepoQueries {
        RepoQueries::new(self.client.clone(), self.cache.clone(), owner, repo, self.now)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetSystemTimePreciseAsFileTime")]
    fn test_provider_new() {
        let provider = Provider::new(None, DEFAULT_GITHUB_API_URL, Cache::in_memory(), Utc::now()).unwrap();
        let queries = provider.repo("Soluto", "kamus");
        assert_eq!(queries.owner(), "Soluto");
        assert_eq!(queries.repo(), "kamus");
    }

    #[test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetSystemTimePreciseAsFileTime")]
    fn test_provider_new_with_token() {
        let _ = Provider::new(Some("test_token"), "https://github.example.com/api/v3", Cache::in_memory(), Utc::now()).unwrap();
    }
}
