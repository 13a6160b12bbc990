use super::hosting::RepoQueries;
use super::registry::{self, PackageInfo};
use super::repo_summary::{ActivityCounts, Interaction, LastInteractions, RepoSummary};
use crate::Result;
use futures_util::future::try_join_all;
use ohno::IntoAppError;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

const LOG_TARGET: &str = "summarizer";
const MANIFEST_FILE_NAME: &str = "package.json";

/// Gather everything we report about one repository.
///
/// All lookups run concurrently and the first failure fails the whole summary.
pub async fn summarize_repo(queries: &RepoQueries, registry: &registry::Provider, fork: bool) -> Result<RepoSummary> {
    log::debug!(target: LOG_TARGET, "Summarizing '{}/{}'", queries.owner(), queries.repo());

    let (contributors, package_summary, last_commit, last_pr, last_issue, issues_in_past_year, prs_in_past_year) = tokio::try_join!(
        queries.contributors(),
        package_summary(queries, registry),
        queries.last_commit_excluding_bots(),
        queries.last_pull_request_excluding_bots(),
        queries.last_issue_excluding_bots(),
        queries.issues_in_past_year(),
        queries.prs_in_past_year(),
    )?;

    Ok(RepoSummary {
        owner: queries.owner().to_string(),
        repo: queries.repo().to_string(),
        fork,
        contributors,
        package_summary,
        last_interactions: LastInteractions {
            commit: last_commit.as_ref().map(Interaction::from),
            pr: last_pr.as_ref().map(Interaction::from),
            issue: last_issue.as_ref().map(Interaction::from),
        },
        activity: ActivityCounts {
            issues_in_past_year,
            prs_in_past_year,
        },
    })
}

/// Resolve every package the repository declares through a manifest.
///
/// Manifests are read in search-result order. When two manifests declare the same
/// package name, the first one wins.
async fn package_summary(queries: &RepoQueries, registry: &registry::Provider) -> Result<BTreeMap<String, PackageInfo>> {
    let hits = queries.find_files_with_name(MANIFEST_FILE_NAME).await?;
    let texts = try_join_all(hits.iter().map(|hit| queries.download_file(&hit.path))).await?;

    let mut seen = HashSet::new();
    let mut declared = Vec::new();

    for (hit, text) in hits.iter().zip(&texts) {
        let manifest: Value = serde_json::from_str(text).into_app_err_with(|| {
            format!("parsing '{}' in '{}/{}'", hit.path, queries.owner(), queries.repo())
        })?;

        let Some((name, version)) = declared_package(&manifest) else {
            log::debug!(target: LOG_TARGET, "Skipping '{}': no package name and version", hit.path);
            continue;
        };

        if seen.insert(name.to_string()) {
            declared.push((name.to_string(), version.to_string()));
        } else {
            log::debug!(target: LOG_TARGET, "Ignoring duplicate declaration of '{name}' in '{}'", hit.path);
        }
    }

    let infos = try_join_all(declared.iter().map(|(name, version)| registry.package_info(name, version))).await?;

    Ok(declared.into_iter().map(|(name, _)| name).zip(infos).collect())
}

/// The `name` and `version` of a manifest, when both are non-empty strings.
fn declared_package(manifest: &Value) -> Option<(&str, &str)> {
    let field = |key: &str| manifest.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
    Some((field("name")?, field("version")?))
}
