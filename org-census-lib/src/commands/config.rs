use crate::Result;
use crate::facts::registry::{DEFAULT_NPM_API_URL, DEFAULT_NPM_WEB_URL};
use crate::facts::{DEFAULT_CACHE_TTL, DEFAULT_MAX_CONCURRENCY, DEFAULT_RETRY_BUDGET, MAX_RETRY_BUDGET};
use crate::facts::hosting::DEFAULT_GITHUB_API_URL;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// Name of the configuration file looked up when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "org-census.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds a cached lookup stays fresh
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of repositories summarized at once (0 means unbounded)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Attempts allowed per repository before it is recorded as failed (0 through 5)
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Base URL of the GitHub REST API
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Base URL of the npm website, used for package pages
    #[serde(default = "default_npm_web_url")]
    pub npm_web_url: String,

    /// Base URL of the npm download-count API
    #[serde(default = "default_npm_api_url")]
    pub npm_api_url: String,
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

const fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

const fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_npm_web_url() -> String {
    DEFAULT_NPM_WEB_URL.to_string()
}

fn default_npm_api_url() -> String {
    DEFAULT_NPM_API_URL.to_string()
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `org-census.toml` in `base_dir` is used when present.
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Check the settings after loading and again after command-line overrides.
    pub(super) fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(app_err!("cache_ttl_secs must be greater than zero"));
        }

        if self.retry_budget > MAX_RETRY_BUDGET {
            return Err(app_err!(
                "retry_budget must be between 0 and {MAX_RETRY_BUDGET}, got {}",
                self.retry_budget
            ));
        }

        for (field, value) in [
            ("github_api_url", &self.github_api_url),
            ("npm_web_url", &self.npm_web_url),
            ("npm_api_url", &self.npm_api_url),
        ] {
            let url = Url::parse(value).into_app_err_with(|| format!("{field} is not a valid URL: '{value}'"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(app_err!("{field} must be an http or https URL, got '{value}'"));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_concurrency: default_max_concurrency(),
            retry_budget: default_retry_budget(),
            github_api_url: default_github_api_url(),
            npm_web_url: default_npm_web_url(),
            npm_api_url: default_npm_api_url(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.retry_budget, 5);
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let (_tmp, dir) = temp_dir();
        assert_eq!(Config::load(&dir, None).unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_base_dir() {
        let (_tmp, dir) = temp_dir();
        fs::write(dir.join(CONFIG_FILE_NAME), "max_concurrency = 3\nretry_budget = 2\n").unwrap();

        let config = Config::load(&dir, None).unwrap();
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.retry_budget, 2);
        assert_eq!(config.github_api_url, DEFAULT_GITHUB_API_URL);
    }

    #[test]
    fn test_load_explicit_path() {
        let (_tmp, dir) = temp_dir();
        let path = dir.join("custom.toml");
        fs::write(&path, "github_api_url = \"http://localhost:8080\"\ncache_ttl_secs = 60\n").unwrap();

        let config = Config::load(&dir, Some(&path)).unwrap();
        assert_eq!(config.github_api_url, "http://localhost:8080");
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let (_tmp, dir) = temp_dir();
        let _ = Config::load(&dir, Some(&dir.join("nope.toml"))).unwrap_err();
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let (_tmp, dir) = temp_dir();
        fs::write(dir.join(CONFIG_FILE_NAME), "max_concurency = 3\n").unwrap();
        let _ = Config::load(&dir, None).unwrap_err();
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = Config {
            cache_ttl_secs: 0,
            ..Config::default()
        };
        let _ = config.validate().unwrap_err();
    }

    #[test]
    fn test_validate_retry_budget_range() {
        let config = Config {
            retry_budget: MAX_RETRY_BUDGET,
            ..Config::default()
        };
        config.validate().unwrap();

        let config = Config {
            retry_budget: 0,
            ..Config::default()
        };
        config.validate().unwrap();

        let (_tmp, dir) = temp_dir();
        fs::write(dir.join(CONFIG_FILE_NAME), "retry_budget = 1000\n").unwrap();
        let err = Config::load(&dir, None).unwrap_err();
        assert!(err.to_string().contains("retry_budget"), "{err}");
    }

    #[test]
    fn test_validate_bad_urls() {
        let config = Config {
            npm_web_url: "not a url".to_string(),
            ..Config::default()
        };
        let _ = config.validate().unwrap_err();

        let config = Config {
            github_api_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        let _ = config.validate().unwrap_err();
    }
}
