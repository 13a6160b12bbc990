use super::Host;
use super::common::{LogLevel, init_logging};
use crate::Result;
use crate::reports::{generate_csv, load_summaries, summary_dir};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// GitHub organization whose summaries are exported
    #[arg(long, value_name = "ORG", env = "ORG")]
    pub org: String,

    /// Directory the summaries were written to
    #[arg(long, value_name = "PATH", default_value = "output")]
    pub output_dir: Utf8PathBuf,

    /// Write the table to this file instead of to standard output
    #[arg(long, value_name = "PATH")]
    pub csv: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// Turn previously written summaries into the flattened CSV table.
pub fn export_csv<H: Host>(host: &mut H, args: &ExportArgs) -> Result<()> {
    init_logging(args.log_level);

    let summaries = load_summaries(&summary_dir(&args.output_dir, &args.org))?;

    if let Some(path) = &args.csv {
        let file = File::create(path).into_app_err_with(|| format!("creating '{path}'"))?;
        generate_csv(&summaries, BufWriter::new(file))?;
        let _ = writeln!(host.output(), "Exported {} repositories to '{path}'", summaries.len());
    } else {
        generate_csv(&summaries, host.output())?;
    }

    Ok(())
}
