//! Encyclopedia search provider using the MediaWiki API
//!
//! Needs no API key and tolerates cloud IPs, which makes it the usual last
//! link of a fallback chain.

use super::{SearchError, SearchOutcome, SearchProvider};
use crate::types::{AppError, Result, SearchHit};
use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const PROVIDER_NAME: &str = "wikipedia";

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

/// Explicit connection settings for [`WikipediaProvider`].
#[derive(Debug, Clone)]
pub struct WikipediaSettings {
    /// Site root, e.g. `https://en.wikipedia.org`; a path such as
    /// `https://host/mirror` is kept as a prefix
    pub base_url: String,
    /// Wikimedia asks API clients to identify themselves
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
            user_agent: format!("delve/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct WikipediaProvider {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    search: Vec<ApiSearchItem>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchItem {
    title: String,
    #[serde(default)]
    snippet: String,
}

impl WikipediaProvider {
    pub fn new(settings: WikipediaSettings) -> Result<Self> {
        let mut base_url = Url::parse(&settings.base_url).map_err(|e| {
            AppError::Configuration(format!(
                "Invalid Wikipedia base_url '{}': {}",
                settings.base_url, e
            ))
        })?;
        // `join` replaces the last segment unless the path ends in `/`
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn api_url(&self) -> std::result::Result<Url, SearchError> {
        self.base_url
            .join("w/api.php")
            .map_err(|e| SearchError::Transport(format!("{}: {}", PROVIDER_NAME, e)))
    }

    /// Article URL for a page title: spaces become underscores, the rest is
    /// percent-encoded as a single path segment.
    pub fn page_url(&self, title: &str) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("wiki")
                .push(&title.replace(' ', "_"));
        }
        url.to_string()
    }
}

fn transport_error(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout(format!("{}: {}", PROVIDER_NAME, err))
    } else {
        SearchError::Transport(format!("{}: {}", PROVIDER_NAME, err))
    }
}

/// Strip search-match markup and the handful of entities MediaWiki emits.
fn clean_snippet(raw: &str) -> String {
    let tag = HTML_TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("static tag pattern"));
    tag.replace_all(raw, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[async_trait]
impl SearchProvider for WikipediaProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, text: &str, limit: usize) -> SearchOutcome {
        let limit_param = limit.to_string();
        let response = self
            .client
            .get(self.api_url()?)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", text),
                ("format", "json"),
                ("srlimit", limit_param.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited(format!(
                "{}: HTTP {}",
                PROVIDER_NAME, status
            )));
        }
        if !status.is_success() {
            return Err(SearchError::Transport(format!(
                "{}: HTTP {}",
                PROVIDER_NAME, status
            )));
        }

        let body: ApiResponse = response.json().await.map_err(transport_error)?;
        let hits: Vec<SearchHit> = body
            .query
            .map(|q| q.search)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|item| SearchHit {
                url: self.page_url(&item.title),
                snippet: clean_snippet(&item.snippet),
                title: item.title,
            })
            .collect();

        debug!(query = text, hits = hits.len(), "wikipedia search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> WikipediaProvider {
        WikipediaProvider::new(WikipediaSettings::default()).unwrap()
    }

    #[test]
    fn test_page_url_encodes_title() {
        let p = provider();
        assert_eq!(
            p.page_url("Caffeine"),
            "https://en.wikipedia.org/wiki/Caffeine"
        );
        assert_eq!(
            p.page_url("Sleep deprivation"),
            "https://en.wikipedia.org/wiki/Sleep_deprivation"
        );
        assert_eq!(
            p.page_url("Café culture"),
            "https://en.wikipedia.org/wiki/Caf%C3%A9_culture"
        );
    }

    #[test]
    fn test_base_url_path_is_kept() {
        let p = WikipediaProvider::new(WikipediaSettings {
            base_url: "https://host.test/mirror".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            p.api_url().unwrap().as_str(),
            "https://host.test/mirror/w/api.php"
        );
        assert_eq!(p.page_url("Caffeine"), "https://host.test/mirror/wiki/Caffeine");
    }

    #[test]
    fn test_clean_snippet() {
        let raw = r#"<span class="searchmatch">Caffeine</span> is a &quot;stimulant&quot;"#;
        assert_eq!(clean_snippet(raw), r#"Caffeine is a "stimulant""#);
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = WikipediaSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            WikipediaProvider::new(settings),
            Err(AppError::Configuration(_))
        ));
    }
}
