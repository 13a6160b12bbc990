use super::package_data::{PackageInfo, PackageStatus};
use crate::Result;
use core::time::Duration;
use ohno::IntoAppError;
use serde::Deserialize;

const LOG_TARGET: &str = "  registry";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Public npm website, where package pages live.
pub const DEFAULT_NPM_WEB_URL: &str = "https://www.npmjs.com";

/// Public npm download-statistics API.
pub const DEFAULT_NPM_API_URL: &str = "https://api.npmjs.org";

#[derive(Debug, Deserialize)]
struct DownloadPoint {
    downloads: Option<u64>,
}

/// Looks up packages on the npm registry.
#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    web_url: String,
    api_url: String,
}

impl Provider {
    pub fn new(web_url: &str, api_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("org-census")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self {
            client,
            web_url: web_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// The public page for `name`.
    #[must_use]
    pub fn package_url(&self, name: &str) -> String {
        format!("{}/package/{name}", self.web_url)
    }

    /// Probe the package page, following redirects.
    pub async fn package_status(&self, name: &str) -> Result<PackageStatus> {
        let url = self.package_url(name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .into_app_err_with(|| format!("requesting '{url}'"))?;

        if resp.status() != reqwest::StatusCode::OK {
            log::debug!(target: LOG_TARGET, "Package '{name}' not found (HTTP {})", resp.status());
            return Ok(PackageStatus::NotFound);
        }

        if resp.url().as_str().starts_with(&format!("{}/login", self.web_url)) {
            return Ok(PackageStatus::PrivateScope);
        }

        Ok(PackageStatus::Found)
    }

    /// Downloads of `name` during the last week, if the registry reports any.
    pub async fn download_count(&self, name: &str) -> Result<Option<u64>> {
        let url = format!("{}/downloads/point/last-week/{name}", self.api_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .into_app_err_with(|| format!("requesting '{url}'"))?;

        if !resp.status().is_success() {
            log::debug!(target: LOG_TARGET, "No download statistics for '{name}' (HTTP {})", resp.status());
            return Ok(None);
        }

        let point: DownloadPoint = resp
            .json()
            .await
            .into_app_err_with(|| format!("decoding download statistics for '{name}'"))?;

        Ok(point.downloads)
    }

    /// Resolve the status of a declared package, plus its downloads when it exists.
    pub async fn package_info(&self, name: &str, version: &str) -> Result<PackageInfo> {
        let status = self.package_status(name).await?;
        let download_count = if status == PackageStatus::Found {
            self.download_count(name).await?
        } else {
            None
        };

        Ok(PackageInfo {
            version: version.to_string(),
            status,
            download_count,
            url: self.package_url(name),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_package_url() {
        let provider = Provider::new("https://www.npmjs.com/", DEFAULT_NPM_API_URL).unwrap();
        assert_eq!(provider.package_url("left-pad"), "https://www.npmjs.com/package/left-pad");
        assert_eq!(provider.package_url("@scope/pkg"), "https://www.npmjs.com/package/@scope/pkg");
    }

    #[tokio::test]
    async fn test_found_package_has_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package/left-pad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/downloads/point/last-week/left-pad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "downloads": 42,
                "package": "left-pad"
            })))
            .mount(&server)
            .await;

        let provider = Provider::new(&server.uri(), &server.uri()).unwrap();
        let info = provider.package_info("left-pad", "1.3.0").await.unwrap();

        assert_eq!(info.status, PackageStatus::Found);
        assert_eq!(info.download_count, Some(42));
        assert_eq!(info.url, format!("{}/package/left-pad", server.uri()));
        assert_eq!(info.version, "1.3.0");
    }

    #[tokio::test]
    async fn test_missing_package_skips_download_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package/internal-tool"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/downloads/point/last-week/internal-tool"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "downloads": 1 })))
            .expect(0)
            .mount(&server)
            .await;

        let provider = Provider::new(&server.uri(), &server.uri()).unwrap();
        let info = provider.package_info("internal-tool", "0.0.1").await.unwrap();

        assert_eq!(info.status, PackageStatus::NotFound);
        assert_eq!(info.download_count, None);
    }

    #[tokio::test]
    async fn test_login_redirect_means_private_scope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package/@acme/secret"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/login?next=/package/@acme/secret", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let provider = Provider::new(&server.uri(), &server.uri()).unwrap();
        assert_eq!(provider.package_status("@acme/secret").await.unwrap(), PackageStatus::PrivateScope);
    }

    #[tokio::test]
    async fn test_download_count_without_statistics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/downloads/point/last-week/brand-new"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "package brand-new not found" })))
            .mount(&server)
            .await;

        let provider = Provider::new(&server.uri(), &server.uri()).unwrap();
        assert_eq!(provider.download_count("brand-new").await.unwrap(), None);
    }
}
