//! GitHub API client
//!
//! Minimal GitHub REST client: authenticated GETs, rate-limit reporting, and
//! `Link`-header pagination.

use super::records::SearchResults;
use crate::Result;
use crate::facts::pagination::{Page, PageSource, Paginator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::marker::PhantomData;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;

const LOG_TARGET: &str = "   hosting";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const LOW_RATE_LIMIT_WARNING: usize = 100;

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

/// How a list endpoint lays out its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// The body is a JSON array.
    Array,
    /// The body is `{ "items": [...] }`, as returned by the search endpoints.
    Search,
}

/// GitHub API client
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a new API client with optional authentication token and base URL
    pub fn new(token: Option<&str>, base_url: impl Into<String>) -> Result<Self> {
        use reqwest::header::{AUTHORIZATION, HeaderValue};

        let mut client_builder = reqwest::Client::builder()
            .user_agent("org-census")
            .timeout(REQUEST_TIMEOUT);

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
        }

        let base_url: String = base_url.into();
        Ok(Self {
            client: client_builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL from path segments and query parameters.
    ///
    /// Each segment is percent-encoded on its own, so names containing `/`, `#`, `?`, or `%`
    /// can't change the shape of the request.
    pub fn endpoint<I>(&self, segments: I, params: &[(&str, &str)]) -> Result<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url =
            url::Url::parse(&self.base_url).into_app_err_with(|| format!("parsing base URL '{}'", self.base_url))?;

        let _ = url
            .path_segments_mut()
            .ok()
            .into_app_err_with(|| format!("'{}' can't be used as a base URL", self.base_url))?
            .pop_if_empty()
            .extend(segments);

        if !params.is_empty() {
            let _ = url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url.into())
    }

    /// Issue a GET and fail on any non-success status.
    pub async fn api_call(&self, url: &str) -> Result<reqwest::Response> {
        let resp = self.send(url).await?;
        check_status(url, resp)
    }

    /// Issue a GET and return the response whatever its status.
    async fn send(&self, url: &str) -> Result<reqwest::Response> {
        log::trace!(target: LOG_TARGET, "GET {url}");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .into_app_err_with(|| format!("requesting '{url}'"))?;

        if let Some(rl) = extract_rate_limit_from_headers(resp.headers())
            && rl.remaining < LOW_RATE_LIMIT_WARNING
        {
            log::debug!(target: LOG_TARGET, "Only {} API requests left until {}", rl.remaining, rl.reset_at);
        }

        Ok(resp)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.api_call(url)
            .await?
            .json()
            .await
            .into_app_err_with(|| format!("decoding response from '{url}'"))
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.api_call(url)
            .await?
            .text()
            .await
            .into_app_err_with(|| format!("reading response body from '{url}'"))
    }

    /// Lazily page through the list at `url`.
    #[must_use]
    pub fn pages<T>(&self, url: String, shape: ListShape) -> Paginator<LinkPages<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Paginator::new(LinkPages {
            client: self.clone(),
            first_url: url,
            shape,
            _item: PhantomData,
        })
    }
}

/// A [`PageSource`] whose cursor is the `rel="next"` URL of the previous response.
#[derive(Debug)]
pub struct LinkPages<T> {
    client: Client,
    first_url: String,
    shape: ListShape,
    _item: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T> PageSource for LinkPages<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<T>> {
        let url = cursor.unwrap_or(&self.first_url);
        let resp = self.client.send(url).await?;

        if is_empty_list_status(resp.status()) {
            log::debug!(target: LOG_TARGET, "'{url}' has no content (HTTP {})", resp.status());
            return Ok(Page::last(Vec::new()));
        }

        let resp = check_status(url, resp)?;

        let next = next_link(resp.headers());

        let items = match self.shape {
            ListShape::Array => resp.json::<Vec<T>>().await,
            ListShape::Search => resp.json::<SearchResults<T>>().await.map(|results| results.items),
        }
        .into_app_err_with(|| format!("decoding page from '{url}'"))?;

        Ok(Page::new(items, next))
    }
}

/// Statuses GitHub uses for lists of an empty repository: 204 for contributors, 409 for commits.
const fn is_empty_list_status(status: StatusCode) -> bool {
    matches!(status, StatusCode::NO_CONTENT | StatusCode::CONFLICT)
}

/// Turn a non-success response into an error, naming the reset time when rate limited.
fn check_status(url: &str, resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
        let reset = extract_rate_limit_from_headers(resp.headers())
            .map_or_else(|| "an unknown time".to_string(), |rl| rl.reset_at.to_rfc3339());
        bail!("rate limited while requesting '{url}' (HTTP {status}); limit resets at {reset}");
    }

    bail!("request to '{url}' failed: HTTP {status}");
}

/// Extract the `rel="next"` target from a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;

    value.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| matches!(param.trim(), r#"rel="next""# | "rel=next"));
        if !is_next {
            return None;
        }

        target.strip_prefix('<')?.strip_suffix('>').map(ToString::to_string)
    })
}

/// Extract rate limit information from API response headers
fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;

    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}
