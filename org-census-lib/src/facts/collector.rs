use super::hosting::{self, records::Repository};
use super::job_tracker::JobTracker;
use super::orchestrator::{JobOutcome, Orchestrator};
use super::progress::Progress;
use super::registry;
use super::repo_summary::RepoSummary;
use super::summarizer::summarize_repo;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

const LOG_TARGET: &str = " collector";

/// The outcome of summarizing every repository of one organization.
#[derive(Debug, Clone)]
pub struct CollectedOrg {
    pub org: String,
    pub results: BTreeMap<String, JobOutcome<RepoSummary>>,
}

impl CollectedOrg {
    pub fn summaries(&self) -> impl Iterator<Item = &RepoSummary> {
        self.results.values().filter_map(JobOutcome::value)
    }

    /// Repositories that could not be summarized, with the attempts spent and the last error.
    pub fn failures(&self) -> impl Iterator<Item = (&str, u32, &ohno::AppError)> {
        self.results.iter().filter_map(|(name, outcome)| match outcome {
            JobOutcome::Failed { attempts, error } => Some((name.as_str(), *attempts, error.as_ref())),
            JobOutcome::Succeeded(_) => None,
        })
    }
}

/// Summarizes all the repositories of an organization.
pub struct Collector {
    hosting: hosting::Provider,
    registry: registry::Provider,
    orchestrator: Orchestrator,
    progress: Arc<dyn Progress>,
}

impl core::fmt::Debug for Collector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collector")
            .field("hosting", &self.hosting)
            .field("registry", &self.registry)
            .field("orchestrator", &self.orchestrator)
            .field("progress", &"<dyn Progress>")
            .finish()
    }
}

impl Collector {
    #[must_use]
    pub fn new(
        hosting: hosting::Provider,
        registry: registry::Provider,
        orchestrator: Orchestrator,
        progress: Arc<dyn Progress>,
    ) -> Self {
        Self {
            hosting,
            registry,
            orchestrator,
            progress,
        }
    }

    /// List the repositories of `org` and summarize each one.
    ///
    /// Failing to list the repositories fails the whole call; failures of individual
    /// repositories are recorded in the result.
    pub async fn collect(&self, org: &str) -> Result<CollectedOrg> {
        self.progress.set_phase("Listing");
        let label = format!("repositories of {org}");
        self.progress.set_indeterminate(Box::new(move || label.clone()));

        let repos = match self.hosting.repositories_for_org(org).await {
            Ok(repos) => repos,
            Err(e) => {
                self.progress.done();
                return Err(e);
            }
        };

        self.progress.set_phase("Summarizing");
        let tracker = JobTracker::new(&self.progress);

        let jobs = repos.into_iter().map(|repo| (repo.name.clone(), repo));
        let results = self
            .orchestrator
            .run(jobs, &tracker, |repo: Repository| async move {
                let queries = self.hosting.repo(org, &repo.name);
                summarize_repo(&queries, &self.registry, repo.fork).await
            })
            .await;

        self.progress.done();

        let (_, succeeded, failed, retried) = tracker.snapshot();
        log::info!(target: LOG_TARGET, "Summarized {succeeded} repositories of '{org}', {failed} failed, {retried} retries");

        Ok(CollectedOrg {
            org: org.to_string(),
            results,
        })
    }
}
