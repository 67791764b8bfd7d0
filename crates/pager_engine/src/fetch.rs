use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use pager_core::{Cursor, Page, SearchError};
use reqwest::header::{HeaderMap, LINK, USER_AGENT};
use reqwest::StatusCode;

use crate::types::{Repository, SearchResponse};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_base: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            user_agent: concat!("pager/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches one page for a cursor. Timeouts and retries are up to the
/// implementation; the engine imposes none.
#[async_trait::async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page<T>, SearchError>;
}

/// GitHub repository search over the REST API.
#[derive(Debug, Clone)]
pub struct GitHubFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl GitHubFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { settings, client })
    }

    /// URL for a cursor: the search endpoint for a seed, the token itself
    /// for a follow-up page.
    pub fn page_url(&self, cursor: &Cursor) -> Result<url::Url, url::ParseError> {
        match cursor {
            Cursor::Seed(query) => {
                let endpoint = format!(
                    "{}/search/repositories",
                    self.settings.api_base.trim_end_matches('/')
                );
                url::Url::parse_with_params(&endpoint, &[("q", query.as_str())])
            }
            Cursor::Next(next) => url::Url::parse(next),
        }
    }
}

#[async_trait::async_trait]
impl PageFetcher<Repository> for GitHubFetcher {
    async fn fetch(&self, cursor: &Cursor) -> Result<Page<Repository>, SearchError> {
        let url = self.page_url(cursor).map_err(|err| {
            engine_warn!("invalid page cursor {:?}: {}", cursor, err);
            SearchError::NetworkError
        })?;
        engine_debug!("fetching {}", url);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.settings.user_agent)
            .send()
            .await
            .map_err(|err| {
                engine_warn!("search request failed: {}", err);
                SearchError::NetworkError
            })?;

        let status = response.status();
        if let Some(error) = classify_status(status) {
            engine_warn!("search request returned {}", status);
            return Err(error);
        }

        let next_cursor = next_page_link(response.headers()).map(Cursor::Next);
        let body = response.bytes().await.map_err(|err| {
            engine_warn!("failed to read search response: {}", err);
            SearchError::NetworkError
        })?;
        let parsed: SearchResponse = serde_json::from_slice(&body).map_err(|err| {
            engine_warn!("failed to parse search response: {}", err);
            SearchError::NetworkError
        })?;

        engine_debug!(
            "received {} repositories, next page: {}",
            parsed.items.len(),
            next_cursor.is_some()
        );
        Ok(Page::new(parsed.items, next_cursor))
    }
}

fn classify_status(status: StatusCode) -> Option<SearchError> {
    if status.is_success() {
        None
    } else if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        Some(SearchError::RateLimitExceeded)
    } else {
        Some(SearchError::NetworkError)
    }
}

fn next_page_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_next_link)
}

/// Extracts the `rel="next"` target from a `Link` header value.
fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(ToOwned::to_owned)
    })
}
