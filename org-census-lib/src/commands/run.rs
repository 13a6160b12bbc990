//! Command dispatch logic for org-census

use super::{ExportArgs, SummarizeArgs, export_csv, summarize_org};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "org-census", version, author, long_about = None)]
#[command(about = "Summarize contributors, activity, and npm packages across a GitHub organization")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: CensusSubcommand,
}

#[derive(Subcommand, Debug)]
enum CensusSubcommand {
    /// Collect a summary of every repository in an organization
    Summarize(Box<SummarizeArgs>),
    /// Flatten previously collected summaries into a CSV table
    Export(ExportArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        CensusSubcommand::Summarize(summarize_args) => summarize_org(host, summarize_args).await,
        CensusSubcommand::Export(export_args) => export_csv(host, export_args),
    }
}
