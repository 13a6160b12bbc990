//! Output of repository summaries
//!
//! Two forms are produced from the same [`RepoSummary`](crate::facts::RepoSummary) records:
//!
//! - **JSON**: one pretty-printed file per repository under `{dir}/{org}/`, which can
//!   be read back with [`load_summaries`] for later export.
//! - **CSV**: one flattened row per repository with the top contributors, the dates
//!   of the last human interactions, and the most downloaded published package.

mod csv;
mod json;

pub use csv::generate as generate_csv;
pub use json::{load_summaries, summary_dir, write_summaries};
