//! Parallel search dispatch with per-sub-question provider fallback.
//!
//! One task per sub-question runs on a `JoinSet`, throttled by a semaphore to
//! `worker_limit`. Inside a task the fallback chain is walked sequentially,
//! each provider at most once, every attempt bounded by `attempt_timeout`.
//! Tasks own their results; the dispatcher merges them only after the join
//! barrier or the run deadline, whichever comes first.

use crate::research::trace::ReasoningTrace;
use crate::search::{FallbackChain, SearchError, SearchProvider};
use crate::types::{ProviderExhaustedError, SearchResult, Stage, SubQuestion};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, warn};

/// Configuration for search dispatch behavior.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Maximum number of sub-questions searched concurrently.
    pub worker_limit: usize,

    /// Timeout for a single provider attempt.
    pub attempt_timeout: Duration,

    /// Upper bound for the whole dispatch when no run deadline is supplied.
    pub deadline: Duration,

    /// Hits requested from each provider.
    pub results_per_query: usize,

    /// Treat a successful but empty response as a reason to try the next provider.
    pub fallback_on_empty: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            worker_limit: 4,
            attempt_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(90),
            results_per_query: 3,
            fallback_on_empty: true,
        }
    }
}

/// Results for every dispatched sub-question.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutput {
    /// Keyed by sub-question id; every dispatched id is present, possibly empty
    pub results: BTreeMap<usize, Vec<SearchResult>>,
    /// Sub-questions whose whole fallback chain failed
    pub failures: Vec<ProviderExhaustedError>,
}

impl DispatchOutput {
    pub fn total_results(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }
}

pub struct SearchDispatcher {
    chain: FallbackChain,
    config: DispatchConfig,
}

impl SearchDispatcher {
    pub fn new(chain: FallbackChain, config: DispatchConfig) -> Self {
        Self { chain, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Search every sub-question, bounded by the configured deadline.
    pub async fn dispatch(
        &self,
        sub_questions: &[SubQuestion],
        trace: &ReasoningTrace,
    ) -> DispatchOutput {
        let deadline = Instant::now() + self.config.deadline;
        self.dispatch_until(sub_questions, trace, deadline).await
    }

    /// Search every sub-question, abandoning in-flight work at `deadline`.
    pub async fn dispatch_until(
        &self,
        sub_questions: &[SubQuestion],
        trace: &ReasoningTrace,
        deadline: Instant,
    ) -> DispatchOutput {
        let mut output = DispatchOutput {
            results: sub_questions.iter().map(|sq| (sq.id, Vec::new())).collect(),
            failures: Vec::new(),
        };
        let mut pending: BTreeSet<usize> = sub_questions.iter().map(|sq| sq.id).collect();

        let semaphore = Arc::new(Semaphore::new(self.config.worker_limit.max(1)));
        let mut set = JoinSet::new();
        let mut task_ids = HashMap::new();

        for sub_question in sub_questions {
            let providers: Vec<Arc<dyn SearchProvider>> = self.chain.providers().to_vec();
            let semaphore = Arc::clone(&semaphore);
            let trace = trace.clone();
            let sub_question = sub_question.clone();
            let config = self.config.clone();

            let id = sub_question.id;
            let handle = set.spawn(async move {
                // Closed only if the semaphore is dropped, which never happens here
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = search_with_fallback(&providers, &sub_question, &config, &trace).await;
                (sub_question.id, outcome)
            });
            task_ids.insert(handle.id(), id);
        }

        loop {
            match timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((id, outcome)))) => {
                    pending.remove(&id);
                    match outcome {
                        Ok(results) => {
                            output.results.insert(id, results);
                        }
                        Err(exhausted) => output.failures.push(exhausted),
                    }
                }
                Ok(Some(Err(join_error))) => {
                    warn!("Search worker failed: {}", join_error);
                    if let Some(id) = task_ids.get(&join_error.id()).copied() {
                        pending.remove(&id);
                        let exhausted = ProviderExhaustedError {
                            sub_question_id: id,
                            attempts: 0,
                            last_error: format!("search worker failed: {}", join_error),
                        };
                        trace.record(
                            Stage::Search,
                            format!(
                                "sub-question {} complete: no results, {}",
                                id, exhausted
                            ),
                        );
                        output.failures.push(exhausted);
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = pending.len(),
                        "Run deadline reached, abandoning in-flight searches"
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        // Anything still pending was aborted at the deadline
        for id in pending {
            let exhausted = ProviderExhaustedError {
                sub_question_id: id,
                attempts: 0,
                last_error: "run deadline reached before the search completed".to_string(),
            };
            trace.record(
                Stage::Search,
                format!(
                    "sub-question {} abandoned: {}; continuing without its results",
                    id, exhausted.last_error
                ),
            );
            output.failures.push(exhausted);
        }
        output.failures.sort_by_key(|f| f.sub_question_id);

        output
    }
}

/// Walk the chain for one sub-question; each provider is tried at most once.
async fn search_with_fallback(
    providers: &[Arc<dyn SearchProvider>],
    sub_question: &SubQuestion,
    config: &DispatchConfig,
    trace: &ReasoningTrace,
) -> Result<Vec<SearchResult>, ProviderExhaustedError> {
    let mut last_error: Option<SearchError> = None;
    let mut attempts = 0;

    for (position, provider) in providers.iter().enumerate() {
        attempts += 1;
        debug!(
            sub_question = sub_question.id,
            provider = provider.name(),
            "Searching"
        );

        let attempt = timeout(
            config.attempt_timeout,
            provider.search(&sub_question.text, config.results_per_query),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SearchError::Timeout(format!(
                "{}: no response within {:?}",
                provider.name(),
                config.attempt_timeout
            )))
        });

        let next = providers.get(position + 1);
        let reason = match attempt {
            Ok(hits) if hits.is_empty() && config.fallback_on_empty && next.is_some() => {
                "returned no results".to_string()
            }
            Ok(hits) => {
                let results: Vec<SearchResult> = hits
                    .into_iter()
                    .take(config.results_per_query)
                    .enumerate()
                    .map(|(i, hit)| SearchResult {
                        sub_question_id: sub_question.id,
                        provider: provider.name().to_string(),
                        url: hit.url,
                        title: hit.title,
                        snippet: hit.snippet,
                        rank: i + 1,
                    })
                    .collect();

                trace.record(
                    Stage::Search,
                    format!(
                        "sub-question {} complete: {} result{} from {}",
                        sub_question.id,
                        results.len(),
                        if results.len() == 1 { "" } else { "s" },
                        provider.name()
                    ),
                );
                return Ok(results);
            }
            Err(error) => {
                let reason = error.to_string();
                last_error = Some(error);
                reason
            }
        };

        if let Some(next) = next {
            trace.record(
                Stage::Search,
                format!(
                    "search for sub-question {} on {} {}, falling back to {}",
                    sub_question.id,
                    provider.name(),
                    reason,
                    next.name()
                ),
            );
        }
    }

    let exhausted = ProviderExhaustedError {
        sub_question_id: sub_question.id,
        attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no search providers configured".to_string()),
    };
    trace.record(
        Stage::Search,
        format!(
            "sub-question {} complete: no results, {}",
            sub_question.id, exhausted
        ),
    );
    Err(exhausted)
}
