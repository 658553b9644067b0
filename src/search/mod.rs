//! Search Provider Adapters
//!
//! Uniform interface over heterogeneous search backends. Every adapter is
//! constructed from an explicit settings value; none of them read credentials
//! or limits from the process environment at call time, so the dispatcher can
//! be exercised with stub providers.
//!
//! # Providers
//!
//! - [`duckduckgo::DuckDuckGoProvider`] - web search via the `daedra` crate
//! - [`wikipedia::WikipediaProvider`] - MediaWiki search API
//!
//! Providers are tried in the order of a [`FallbackChain`].

pub mod duckduckgo;
pub mod rate_limit;
pub mod wikipedia;

use crate::types::SearchHit;
use async_trait::async_trait;
use std::sync::Arc;

pub use duckduckgo::DuckDuckGoProvider;
pub use wikipedia::{WikipediaProvider, WikipediaSettings};

/// Failure of a single provider call.
///
/// All variants are recoverable: the dispatcher reacts to each of them by
/// moving to the next provider in the chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type SearchOutcome = std::result::Result<Vec<SearchHit>, SearchError>;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider label recorded on every result
    fn name(&self) -> &str;

    /// Search for `text`, returning at most `limit` hits in relevance order.
    async fn search(&self, text: &str, limit: usize) -> SearchOutcome;
}

/// Ordered list of providers tried in sequence for one sub-question.
#[derive(Clone, Default)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain
    pub fn with(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<dyn SearchProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn SearchProvider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
