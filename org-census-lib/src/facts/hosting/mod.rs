mod client;
mod provider;
mod queries;
pub mod records;

pub use client::{Client, LinkPages, ListShape, RateLimitInfo};
pub use provider::{DEFAULT_GITHUB_API_URL, Provider};
pub use queries::RepoQueries;
