use super::client::{Client, ListShape};
use super::records::{CodeSearchHit, Commit, ContentEntry, Contributor, Issue, PullRequest};
use crate::Result;
use crate::facts::bots::{is_bot, is_dependency_bot_title};
use crate::facts::cache::Cache;
use crate::facts::cache_key::{CacheKey, Operation};
use chrono::{DateTime, Utc};
use core::iter;
use ohno::{EnrichableExt, IntoAppError};

const LOG_TARGET: &str = "   hosting";
const PAST_YEAR_DAYS: i64 = 365;
const FULL_PAGE: &str = "100";

/// Cached GitHub lookups scoped to one repository.
///
/// Every operation goes through [`Cache::get_or_compute`] with a key derived from the
/// operation name and the repository, so repeated calls within the cache TTL never
/// reach the network.
#[derive(Debug, Clone)]
pub struct RepoQueries {
    client: Client,
    cache: Cache,
    owner: String,
    repo: String,
    now: DateTime<Utc>,
}

impl RepoQueries {
    pub(crate) fn new(client: Client, cache: Cache, owner: &str, repo: &str, now: DateTime<Utc>) -> Self {
        Self {
            client,
            cache,
            owner: owner.to_string(),
            repo: repo.to_string(),
            now,
        }
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn key(&self, operation: Operation) -> CacheKey {
        CacheKey::repo(operation, &self.owner, &self.repo)
    }

    fn repo_endpoint<'a>(
        &'a self,
        resource: impl IntoIterator<Item = &'a str>,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let segments = ["repos", self.owner.as_str(), self.repo.as_str()].into_iter().chain(resource);
        self.client.endpoint(segments, params)
    }

    fn past_year_cutoff(&self) -> DateTime<Utc> {
        self.now - chrono::Duration::days(PAST_YEAR_DAYS)
    }

    /// Every human contributor of the repository.
    pub async fn contributors(&self) -> Result<Vec<Contributor>> {
        self.cache
            .get_or_compute(self.key(Operation::Contributors), || async {
                let url = self.repo_endpoint(["contributors"], &[("per_page", FULL_PAGE)])?;
                let all: Vec<Contributor> = self.client.pages(url, ListShape::Array).collect_all().await?;
                Ok(all.into_iter().filter(|c| !is_bot(&c.login)).collect())
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("listing contributors of '{}/{}'", self.owner, self.repo)))
    }

    /// Every file in the repository named `filename`, in search-result order.
    pub async fn find_files_with_name(&self, filename: &str) -> Result<Vec<CodeSearchHit>> {
        let key = CacheKey::repo_resource(Operation::FindFiles, &self.owner, &self.repo, filename);

        self.cache
            .get_or_compute(key, || async {
                let query = format!("repo:{}/{} filename:{filename}", self.owner, self.repo);
                let url = self.client.endpoint(["search", "code"], &[("q", query.as_str())])?;
                self.client.pages(url, ListShape::Search).collect_all().await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("searching '{}/{}' for '{filename}'", self.owner, self.repo)))
    }

    /// The raw text of the file at `path`.
    pub async fn download_file(&self, path: &str) -> Result<String> {
        let key = CacheKey::repo_resource(Operation::FileContent, &self.owner, &self.repo, path);

        self.cache
            .get_or_compute(key, || async {
                let url = self.repo_endpoint(iter::once("contents").chain(path.split('/')), &[])?;
                let entry: ContentEntry = self.client.get_json(&url).await?;
                let download_url = entry
                    .download_url
                    .into_app_err_with(|| format!("'{path}' has no download URL"))?;

                log::debug!(target: LOG_TARGET, "Downloading '{path}' from '{}/{}'", self.owner, self.repo);
                self.client.get_text(&download_url).await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("downloading '{path}' from '{}/{}'", self.owner, self.repo)))
    }

    /// The most recent commit whose author is not a bot.
    pub async fn last_commit_excluding_bots(&self) -> Result<Option<Commit>> {
        self.cache
            .get_or_compute(self.key(Operation::LastCommitExcludingBots), || async {
                let url = self.repo_endpoint(["commits"], &[("per_page", "10")])?;
                self.client
                    .pages::<Commit>(url, ListShape::Array)
                    .find_first(|commit| !commit.author_name().is_some_and(is_bot))
                    .await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("finding the last commit of '{}/{}'", self.owner, self.repo)))
    }

    /// The most recently updated pull request opened by a human.
    pub async fn last_pull_request_excluding_bots(&self) -> Result<Option<PullRequest>> {
        self.cache
            .get_or_compute(self.key(Operation::LastPullRequestExcludingBots), || async {
                let url = self.repo_endpoint(["pulls"], &[("per_page", "10"), ("state", "all"), ("direction", "desc")])?;
                self.client
                    .pages::<PullRequest>(url, ListShape::Array)
                    .find_first(is_human_pull_request)
                    .await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("finding the last pull request of '{}/{}'", self.owner, self.repo)))
    }

    /// The most recently updated issue, not counting pull requests, opened by a human.
    pub async fn last_issue_excluding_bots(&self) -> Result<Option<Issue>> {
        self.cache
            .get_or_compute(self.key(Operation::LastIssueExcludingBots), || async {
                let url = self.repo_endpoint(["issues"], &[("per_page", "30"), ("state", "all"), ("direction", "desc")])?;
                self.client
                    .pages::<Issue>(url, ListShape::Array)
                    .find_first(is_human_issue)
                    .await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("finding the last issue of '{}/{}'", self.owner, self.repo)))
    }

    /// Number of human issues updated in the trailing year.
    pub async fn issues_in_past_year(&self) -> Result<u64> {
        let cutoff = self.past_year_cutoff();

        self.cache
            .get_or_compute(self.key(Operation::IssuesInPastYear), || async {
                let since = cutoff.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
                let url = self.repo_endpoint(
                    ["issues"],
                    &[("per_page", FULL_PAGE), ("state", "all"), ("since", since.as_str())],
                )?;
                self.client
                    .pages::<Issue>(url, ListShape::Array)
                    .count_where(|issue| is_human_issue(issue) && issue.updated_at.is_some_and(|at| at >= cutoff))
                    .await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("counting recent issues of '{}/{}'", self.owner, self.repo)))
    }

    /// Number of human pull requests updated in the trailing year.
    pub async fn prs_in_past_year(&self) -> Result<u64> {
        let cutoff = self.past_year_cutoff();

        self.cache
            .get_or_compute(self.key(Operation::PrsInPastYear), || async {
                let url = self.repo_endpoint(["pulls"], &[("per_page", FULL_PAGE), ("state", "all")])?;
                self.client
                    .pages::<PullRequest>(url, ListShape::Array)
                    .count_where(|pr| is_human_pull_request(pr) && pr.updated_at.is_some_and(|at| at >= cutoff))
                    .await
            })
            .await
            .map_err(|e| e.enrich_with(|| format!("counting recent pull requests of '{}/{}'", self.owner, self.repo)))
    }
}

fn is_human_pull_request(pr: &PullRequest) -> bool {
    !pr.author().is_some_and(is_bot) && !is_dependency_bot_title(&pr.title)
}

fn is_human_issue(issue: &Issue) -> bool {
    !issue.is_pull_request() && !issue.author().is_some_and(is_bot)
}
