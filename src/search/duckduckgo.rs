//! Web search provider using daedra
//!
//! daedra scrapes DuckDuckGo, which throttles datacenter IPs aggressively.
//! Failures are classified by [`super::rate_limit`] so the dispatcher can
//! fall back to the next provider.

use super::rate_limit::classify_failure;
use super::{SearchOutcome, SearchProvider};
use crate::types::SearchHit;
use async_trait::async_trait;
use tracing::debug;

pub const PROVIDER_NAME: &str = "duckduckgo";

/// Web search provider powered by daedra
pub struct DuckDuckGoProvider;

impl DuckDuckGoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DuckDuckGoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search(&self, text: &str, limit: usize) -> SearchOutcome {
        let search_args = daedra::SearchArgs {
            query: text.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: limit,
                ..Default::default()
            }),
        };

        match daedra::tools::search::perform_search(&search_args).await {
            Ok(response) => {
                let hits: Vec<SearchHit> = response
                    .data
                    .iter()
                    .filter(|r| !r.url.trim().is_empty())
                    .take(limit)
                    .map(|r| SearchHit {
                        url: r.url.clone(),
                        title: r.title.clone(),
                        snippet: r.description.clone(),
                    })
                    .collect();

                debug!(query = text, hits = hits.len(), "duckduckgo search complete");
                Ok(hits)
            }
            Err(e) => Err(classify_failure(PROVIDER_NAME, &e.to_string())),
        }
    }
}
