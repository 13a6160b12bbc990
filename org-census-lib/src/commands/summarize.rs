use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::facts::CollectedOrg;
use crate::reports::{generate_csv, summary_dir, write_summaries};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Parser, Debug)]
pub struct SummarizeArgs {
    /// GitHub organization whose repositories are summarized
    #[arg(long, value_name = "ORG", env = "ORG")]
    pub org: String,

    /// Directory that receives one `{org}/{repo}.json` summary per repository
    #[arg(long, value_name = "PATH", default_value = "output")]
    pub output_dir: Utf8PathBuf,

    /// Also write the flattened table to a CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<Utf8PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn summarize_org<H: Host>(host: &mut H, args: &SummarizeArgs) -> Result<()> {
    let common = Common::new(&args.common).await?;
    let collected = common.collector.collect(&args.org).await?;

    let written = write_summaries(&args.output_dir, &collected.org, collected.summaries())?;
    let _ = writeln!(
        host.output(),
        "Wrote {} summaries to '{}'",
        written.len(),
        summary_dir(&args.output_dir, &collected.org)
    );

    if let Some(path) = &args.csv {
        let file = File::create(path).into_app_err_with(|| format!("creating '{path}'"))?;
        generate_csv(collected.summaries(), BufWriter::new(file))?;
        let _ = writeln!(host.output(), "Wrote CSV table to '{path}'");
    }

    report_failures(host, &collected);
    Ok(())
}

fn report_failures<H: Host>(host: &mut H, collected: &CollectedOrg) {
    let failures: Vec<_> = collected.failures().collect();
    if failures.is_empty() {
        return;
    }

    let mut err = host.error();
    let _ = writeln!(err, "\nUnable to summarize {} repositor{}", failures.len(), if failures.len() == 1 { "y" } else { "ies" });
    for (repo, attempts, error) in failures {
        let _ = writeln!(err, "  '{repo}' failed after {attempts} attempt(s): {error:#}");
    }
}
