//! Argument handling and setup shared by the subcommands.

use super::ProgressReporter;
use super::config::Config;
use crate::Result;
use crate::facts::{Cache, Collector, FileCacheStore, MAX_RETRY_BUDGET, Orchestrator, SystemClock, hosting, registry};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use clap::{Args, ValueEnum};
use core::time::Duration;
use directories::BaseDirs;
use ohno::IntoAppError;
use std::io::IsTerminal;
use std::sync::Arc;

const LOG_TARGET: &str = "  commands";

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Resolve `Auto` against whether the stream is a terminal.
    #[must_use]
    pub const fn enabled(self, is_terminal: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => is_terminal,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments for commands that talk to GitHub
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Path to configuration file (default is `org-census.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Directory where lookups are cached
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Maximum number of repositories summarized at once, 0 for no limit [default: 10]
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Attempts allowed per repository before giving up, 0 through 5 [default: 5]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_RETRY_BUDGET)))]
    pub retries: Option<u32>,

    /// Ignore cached data and fetch everything fresh
    #[arg(long)]
    pub ignore_cached: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// Everything a command needs to collect an organization.
#[derive(Debug)]
pub struct Common {
    pub collector: Collector,
    pub config: Config,
}

impl Common {
    pub async fn new(args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);

        let mut config = Config::load(Utf8Path::new("."), args.config.as_ref())?;
        if let Some(max_concurrency) = args.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if let Some(retries) = args.retries {
            config.retry_budget = retries;
        }
        config.validate()?;

        let cache_dir = if let Some(cache_path) = &args.cache_dir {
            cache_path.as_std_path().to_path_buf()
        } else {
            BaseDirs::new()
                .into_app_err("could not determine cache directory")?
                .cache_dir()
                .join("org-census")
        };

        log::debug!(target: LOG_TARGET, "Using cache directory '{}'", cache_dir.display());

        let store = FileCacheStore::open(cache_dir, Arc::new(SystemClock)).await?;
        let cache = Cache::new(Arc::new(store), config.cache_ttl(), args.ignore_cached);

        let hosting = hosting::Provider::new(args.github_token.as_deref(), &config.github_api_url, cache, Utc::now())?;
        let registry = registry::Provider::new(&config.npm_web_url, &config.npm_api_url)?;
        let orchestrator = Orchestrator::new(config.max_concurrency, config.retry_budget);

        // keep the bar out of the way of log lines
        let delay = if args.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        };

        let progress = ProgressReporter::new(delay, args.color.enabled(std::io::stderr().is_terminal()));
        let collector = Collector::new(hosting, registry, orchestrator, Arc::new(progress));

        Ok(Self { collector, config })
    }
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // a logger may already be installed when commands run more than once in a process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
