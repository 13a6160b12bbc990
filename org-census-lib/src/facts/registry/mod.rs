//! npm registry lookups for the packages repositories declare.

mod package_data;
mod provider;

pub use package_data::{PackageInfo, PackageStatus};
pub use provider::{DEFAULT_NPM_API_URL, DEFAULT_NPM_WEB_URL, Provider};
