use crate::Result;
use crate::facts::{Interaction, RepoSummary};
use chrono::SecondsFormat;
use ohno::IntoAppError;
use serde::Serialize;
use std::io::Write;

const HEADERS: [&str; 9] = [
    "repo",
    "contributor1",
    "contributor2",
    "contributor3",
    "lastCommit",
    "lastPR",
    "lastIssue",
    "mostUsedPackageName",
    "mostUsedPackageDownloadCount",
];

/// One flattened row; field order must match `HEADERS`.
#[derive(Debug, Serialize)]
struct Row<'a> {
    repo: &'a str,
    contributor1: Option<&'a str>,
    contributor2: Option<&'a str>,
    contributor3: Option<&'a str>,
    last_commit: Option<String>,
    last_pr: Option<String>,
    last_issue: Option<String>,
    most_used_package_name: Option<&'a str>,
    most_used_package_download_count: Option<u64>,
}

impl<'a> Row<'a> {
    fn new(summary: &'a RepoSummary) -> Self {
        let contributor = |index: usize| {
            summary
                .contributors
                .get(index)
                .map(|c| c.html_url.as_deref().unwrap_or(c.login.as_str()))
        };
        let most_used = summary.most_used_package();

        Self {
            repo: &summary.repo,
            contributor1: contributor(0),
            contributor2: contributor(1),
            contributor3: contributor(2),
            last_commit: format_date(summary.last_interactions.commit.as_ref()),
            last_pr: format_date(summary.last_interactions.pr.as_ref()),
            last_issue: format_date(summary.last_interactions.issue.as_ref()),
            most_used_package_name: most_used.map(|(name, _)| name),
            most_used_package_download_count: most_used.and_then(|(_, info)| info.download_count),
        }
    }
}

fn format_date(interaction: Option<&Interaction>) -> Option<String> {
    interaction
        .and_then(|i| i.date)
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Write the flattened table, one row per summary, sorted by repository name.
///
/// The header row is always written, even with no summaries.
pub fn generate<'a, W: Write>(summaries: impl IntoIterator<Item = &'a RepoSummary>, writer: W) -> Result<()> {
    let mut rows: Vec<Row<'_>> = summaries.into_iter().map(Row::new).collect();
    rows.sort_by(|a, b| a.repo.cmp(b.repo));

    let mut csv = ::csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv.write_record(HEADERS).into_app_err("writing CSV header")?;

    for row in &rows {
        csv.serialize(row).into_app_err_with(|| format!("writing CSV row for '{}'", row.repo))?;
    }

    csv.flush().into_app_err("flushing CSV output")?;
    Ok(())
}
