//! Mock implementations for testing.
//!
//! Mock text-generation clients and scripted search providers shared by the
//! integration tests, so no test touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use delve::llm::LLMClient;
use delve::search::{SearchError, SearchOutcome, SearchProvider};
use delve::types::{AppError, Result, SearchHit};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock LLM client with configurable responses.
///
/// Responses are handed out in order; once the queue runs dry the last one
/// repeats. Every prompt is recorded for later inspection.
///
/// # Examples
///
/// ```ignore
/// // Planner call first, synthesizer call second
/// let client = MockLLMClient::sequence(&["1. a\n2. b", "Answer [1]."]);
///
/// // A client that always fails
/// let client = MockLLMClient::failing();
/// ```
pub struct MockLLMClient {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    should_fail: bool,
    prompts: Mutex<Vec<String>>,
    system_prompts: Mutex<Vec<String>>,
}

impl MockLLMClient {
    /// Create a new mock client that always returns the given response.
    pub fn new(response: &str) -> Self {
        Self::sequence(&[response])
    }

    /// Create a mock client that returns `responses` one call at a time.
    pub fn sequence(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
            should_fail: false,
            prompts: Mutex::new(Vec::new()),
            system_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::sequence(&[])
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// System prompts received so far, in call order.
    pub fn system_prompts(&self) -> Vec<String> {
        self.system_prompts.lock().clone()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }

        let mut last = self.last.lock();
        if let Some(next) = self.responses.lock().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.system_prompts.lock().push(system.to_string());
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// LLM client that never answers within any reasonable deadline.
pub struct StalledLLMClient;

#[async_trait]
impl LLMClient for StalledLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

/// One scripted reaction of a [`StubSearchProvider`].
#[derive(Clone)]
pub enum Script {
    /// Return hits whose URLs are `https://{host}/{slug of query}/{i}`
    Hits { host: String, count: usize },
    /// Return these exact hits
    Fixed(Vec<SearchHit>),
    Fail(SearchError),
    /// Sleep this long, then return a single hit
    Slow(Duration),
}

/// Search provider that follows a script instead of the network.
///
/// Scripts can be keyed by a substring of the query; the default script
/// applies to everything else. Calls are counted.
pub struct StubSearchProvider {
    name: String,
    default: Script,
    per_query: Vec<(String, Script)>,
    calls: AtomicUsize,
}

impl StubSearchProvider {
    pub fn new(name: &str, default: Script) -> Self {
        Self {
            name: name.to_string(),
            default,
            per_query: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Hits under `https://{host}/...` for every query.
    pub fn hits(name: &str, host: &str, count: usize) -> Self {
        Self::new(
            name,
            Script::Hits {
                host: host.to_string(),
                count,
            },
        )
    }

    pub fn failing(name: &str, error: SearchError) -> Self {
        Self::new(name, Script::Fail(error))
    }

    /// Use `script` for queries containing `needle`.
    pub fn on(mut self, needle: &str, script: Script) -> Self {
        self.per_query.push((needle.to_string(), script));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn slug(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[async_trait]
impl SearchProvider for StubSearchProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, text: &str, limit: usize) -> SearchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let script = self
            .per_query
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| self.default.clone());

        match script {
            Script::Hits { host, count } => Ok((1..=count.min(limit))
                .map(|i| SearchHit {
                    url: format!("https://{}/{}/{}", host, slug(text), i),
                    title: format!("{} result {}", text, i),
                    snippet: format!("Snippet {} about {}", i, text),
                })
                .collect()),
            Script::Fixed(hits) => Ok(hits.into_iter().take(limit).collect()),
            Script::Fail(error) => Err(error),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(vec![SearchHit {
                    url: format!("https://slow.test/{}", slug(text)),
                    title: text.to_string(),
                    snippet: String::new(),
                }])
            }
        }
    }
}

/// Shorthand for a hit with an explicit URL.
pub fn hit(url: &str, title: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        snippet: format!("About {}", title),
    }
}

/// Provider that fails its first `failures` calls, then answers normally.
pub struct FlakyProvider {
    name: String,
    failures: usize,
    error: SearchError,
    calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(name: &str, failures: usize, error: SearchError) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            failures,
            error,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FlakyProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, text: &str, _limit: usize) -> SearchOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(self.error.clone());
        }
        Ok(vec![SearchHit {
            url: format!("https://{}.test/{}", self.name, slug(text)),
            title: text.to_string(),
            snippet: format!("Recovered result for {}", text),
        }])
    }
}
