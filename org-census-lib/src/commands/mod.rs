//! Command-line interface for org-census
//!
//! This module parses arguments, loads configuration, and drives the collection
//! pipeline in [`crate::facts`] and the writers in [`crate::reports`].
//!
//! # Commands
//!
//! - **summarize**: List every repository of an organization, summarize each one
//!   concurrently, and write one JSON file per repository (optionally also the CSV
//!   table). Repositories that could not be summarized are listed on stderr.
//! - **export**: Read the JSON summaries back and produce the flattened CSV table.
//!
//! Settings come from flags and environment variables (`GITHUB_TOKEN`, `ORG`), with
//! an optional `org-census.toml` file supplying defaults that flags override.

mod common;
mod config;
mod export;
mod host;
mod progress_reporter;
mod run;
mod summarize;

#[cfg(debug_assertions)]
pub use config::Config;

pub use export::{ExportArgs, export_csv};
pub use host::Host;
pub use progress_reporter::ProgressReporter;
pub use run::run;
pub use summarize::{SummarizeArgs, summarize_org};
