use crate::Result;
use crate::facts::RepoSummary;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, bail};
use std::fs;

const LOG_TARGET: &str = "   reports";

/// Directory holding the summaries of `org`.
#[must_use]
pub fn summary_dir(output_dir: &Utf8Path, org: &str) -> Utf8PathBuf {
    output_dir.join(org)
}

/// Write one `{repo}.json` file per summary under `{output_dir}/{org}`.
///
/// Returns the paths written.
pub fn write_summaries<'a>(
    output_dir: &Utf8Path,
    org: &str,
    summaries: impl IntoIterator<Item = &'a RepoSummary>,
) -> Result<Vec<Utf8PathBuf>> {
    let dir = summary_dir(output_dir, org);
    fs::create_dir_all(&dir).into_app_err_with(|| format!("creating directory '{dir}'"))?;

    let mut written = Vec::new();
    for summary in summaries {
        if summary.repo.is_empty() || summary.repo.contains(['/', '\\']) || summary.repo.starts_with('.') {
            bail!("refusing to write summary for unusual repository name '{}'", summary.repo);
        }

        let path = dir.join(format!("{}.json", summary.repo));
        let text = serde_json::to_string_pretty(summary).into_app_err_with(|| format!("serializing summary of '{}'", summary.repo))?;
        fs::write(&path, text).into_app_err_with(|| format!("writing '{path}'"))?;

        log::debug!(target: LOG_TARGET, "Wrote '{path}'");
        written.push(path);
    }

    Ok(written)
}

/// Read back every `*.json` summary in `dir`, ordered by file name.
pub fn load_summaries(dir: &Utf8Path) -> Result<Vec<RepoSummary>> {
    let mut paths = Vec::new();
    for entry in dir.read_dir_utf8().into_app_err_with(|| format!("reading directory '{dir}'"))? {
        let entry = entry.into_app_err_with(|| format!("reading directory '{dir}'"))?;
        if entry.path().extension() == Some("json") {
            paths.push(entry.into_path());
        }
    }

    paths.sort();

    paths
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading '{path}'"))?;
            serde_json::from_str(&text).into_app_err_with(|| format!("parsing summary '{path}'"))
        })
        .collect()
}
