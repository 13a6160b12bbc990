//! Data collection and aggregation for organization repositories
//!
//! This module gathers information about every repository of a GitHub organization
//! and reduces it to one [`RepoSummary`] per repository.
//!
//! # Implementation Model
//!
//! The pipeline is built from a handful of layers, leaves first:
//!
//! - **Pagination**: [`Paginator`] pulls one page at a time from a [`PageSource`],
//!   following the continuation cursor until the source is exhausted. Searches stop
//!   as soon as a match is found, so later pages are never requested.
//! - **Caching**: [`Cache::get_or_compute`] memoizes remote lookups behind a fixed TTL.
//!   The backing [`CacheStore`] is injected, with a directory-backed store for the CLI
//!   and an in-memory store with a controllable [`Clock`] for tests.
//! - **Queries**: [`hosting::RepoQueries`] exposes the named, cache-wrapped GitHub
//!   lookups for one repository.
//! - **Orchestration**: [`Orchestrator`] runs one job per repository under a
//!   concurrency ceiling, retrying failed jobs and isolating permanent failures.
//! - **Summarization**: [`summarize_repo`] fans out the queries for one repository
//!   and reduces them into a [`RepoSummary`].
//!
//! The [`Collector`] wires all of this together for one organization.

mod bots;
mod cache;
mod cache_key;
mod cache_lock;
mod collector;
mod file_cache;
pub mod hosting;
mod job_tracker;
mod orchestrator;
mod pagination;
mod progress;
pub mod registry;
mod repo_summary;
mod summarizer;
mod throttler;

pub use bots::{is_bot, is_dependency_bot_title};
pub use cache::{Cache, CacheStore, Clock, DEFAULT_CACHE_TTL, ManualClock, MemoryCacheStore, SystemClock};
pub use cache_key::{CacheKey, Operation};
pub use collector::{CollectedOrg, Collector};
pub use file_cache::FileCacheStore;
pub use job_tracker::JobTracker;
pub use orchestrator::{DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_BUDGET, JobOutcome, MAX_RETRY_BUDGET, Orchestrator};
pub use pagination::{Page, PageSource, Paginator};
pub use progress::{NoProgress, Progress};
pub use repo_summary::{ActivityCounts, Interaction, LastInteractions, RepoSummary};
pub use summarizer::summarize_repo;
