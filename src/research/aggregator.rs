//! Merge, deduplicate and rank search results into citable sources.
//!
//! Ranking key, in order:
//! 1. number of distinct sub-questions that surfaced the URL (descending)
//! 2. best provider rank among its occurrences (ascending)
//! 3. first-seen position in the flattened input (ascending)
//!
//! Input is flattened in sub-question id order, then provider rank order, so
//! the output is fully determined by its input.

use crate::research::trace::ReasoningTrace;
use crate::types::{SearchResult, Source, Stage};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use url::Url;

/// Query parameters stripped during normalization unless configured otherwise.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &["utm_*", "fbclid", "gclid", "mc_cid", "mc_eid", "ref"];

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Sources kept after ranking
    pub max_sources: usize,
    /// Parameter names to strip; a trailing `*` matches a prefix
    pub tracking_params: Vec<String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_sources: 12,
            tracking_params: DEFAULT_TRACKING_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct Aggregator {
    config: AggregationConfig,
}

struct Candidate {
    first: SearchResult,
    normalized_url: String,
    sub_questions: BTreeSet<usize>,
    best_rank: usize,
    first_seen: usize,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Rank all results into at most `max_sources` unique sources.
    pub fn aggregate(&self, results: &BTreeMap<usize, Vec<SearchResult>>) -> Vec<Source> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut by_url: HashMap<String, usize> = HashMap::new();

        for result in results.values().flatten() {
            let normalized_url = normalize_url(&result.url, &self.config.tracking_params);

            match by_url.get(&normalized_url) {
                Some(&index) => {
                    let candidate = &mut candidates[index];
                    candidate.sub_questions.insert(result.sub_question_id);
                    candidate.best_rank = candidate.best_rank.min(result.rank);
                }
                None => {
                    let first_seen = candidates.len();
                    by_url.insert(normalized_url.clone(), first_seen);
                    candidates.push(Candidate {
                        first: result.clone(),
                        normalized_url,
                        sub_questions: BTreeSet::from([result.sub_question_id]),
                        best_rank: result.rank,
                        first_seen,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.sub_questions
                .len()
                .cmp(&a.sub_questions.len())
                .then(a.best_rank.cmp(&b.best_rank))
                .then(a.first_seen.cmp(&b.first_seen))
        });
        candidates.truncate(self.config.max_sources);

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| Source {
                citation_index: i + 1,
                url: c.first.url,
                normalized_url: c.normalized_url,
                title: c.first.title,
                snippet: c.first.snippet,
                provider: c.first.provider,
                corroboration: c.sub_questions.len(),
                best_rank: c.best_rank,
                sub_question_ids: c.sub_questions.into_iter().collect(),
            })
            .collect()
    }

    /// [`aggregate`](Self::aggregate) plus a trace entry summarizing the merge.
    pub fn aggregate_traced(
        &self,
        results: &BTreeMap<usize, Vec<SearchResult>>,
        trace: &ReasoningTrace,
    ) -> Vec<Source> {
        let raw: usize = results.values().map(Vec::len).sum();
        let sources = self.aggregate(results);
        let corroborated = sources.iter().filter(|s| s.corroboration > 1).count();

        trace.record(
            Stage::Aggregation,
            format!(
                "merged {} raw results into {} unique sources ({} corroborated by several sub-questions, cutoff {})",
                raw,
                sources.len(),
                corroborated,
                self.config.max_sources
            ),
        );
        sources
    }
}

fn is_tracking_param(name: &str, tracking_params: &[String]) -> bool {
    let name = name.to_lowercase();
    tracking_params.iter().any(|pattern| {
        let pattern = pattern.to_lowercase();
        match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        }
    })
}

/// Deduplication key for a URL.
///
/// Scheme, host and path compare case-insensitively; fragments, trailing
/// slashes and tracking parameters are dropped; remaining parameters are
/// sorted. Unparseable input falls back to its trimmed lowercase form.
pub fn normalize_url(raw: &str, tracking_params: &[String]) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.trim().to_lowercase();
    };

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k, tracking_params))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = url.path().to_lowercase();
    let path = path.trim_end_matches('/');

    let mut key = format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default().to_lowercase()
    );
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }
    key.push_str(path);
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(sub_question_id: usize, url: &str, rank: usize) -> SearchResult {
        SearchResult {
            sub_question_id,
            provider: "test".to_string(),
            url: url.to_string(),
            title: format!("title {}", url),
            snippet: String::new(),
            rank,
        }
    }

    fn defaults() -> Vec<String> {
        AggregationConfig::default().tracking_params
    }

    #[test]
    fn test_normalize_strips_tracking_and_case() {
        let a = normalize_url(
            "HTTPS://Example.com/Sleep/?utm_source=x&b=2&a=1#section",
            &defaults(),
        );
        let b = normalize_url("https://example.com/sleep?a=1&b=2&fbclid=abc", &defaults());
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/sleep?a=1&b=2");
    }

    #[test]
    fn test_normalize_keeps_meaningful_params() {
        let a = normalize_url("https://example.com/search?q=caffeine", &defaults());
        let b = normalize_url("https://example.com/search?q=sleep", &defaults());
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_unparseable() {
        assert_eq!(normalize_url("  Not A URL ", &defaults()), "not a url");
    }

    #[test]
    fn test_corroboration_outranks_rank() {
        let mut results = BTreeMap::new();
        results.insert(
            1,
            vec![result(1, "https://a.test", 1), result(1, "https://b.test", 2)],
        );
        results.insert(2, vec![result(2, "https://b.test/", 3)]);

        let sources = Aggregator::new(AggregationConfig::default()).aggregate(&results);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://b.test");
        assert_eq!(sources[0].corroboration, 2);
        assert_eq!(sources[0].best_rank, 2);
        assert_eq!(sources[0].sub_question_ids, vec![1, 2]);
        assert_eq!(sources[0].citation_index, 1);
        assert_eq!(sources[1].url, "https://a.test");
        assert_eq!(sources[1].citation_index, 2);
    }

    #[test]
    fn test_first_seen_breaks_ties() {
        let mut results = BTreeMap::new();
        results.insert(1, vec![result(1, "https://first.test", 1)]);
        results.insert(2, vec![result(2, "https://second.test", 1)]);

        let sources = Aggregator::new(AggregationConfig::default()).aggregate(&results);
        assert_eq!(sources[0].url, "https://first.test");
        assert_eq!(sources[1].url, "https://second.test");
    }

    #[test]
    fn test_truncates_to_max_sources() {
        let mut results = BTreeMap::new();
        results.insert(
            1,
            (1..=5)
                .map(|i| result(1, &format!("https://s{}.test", i), i))
                .collect(),
        );
        let config = AggregationConfig {
            max_sources: 3,
            ..Default::default()
        };

        let sources = Aggregator::new(config).aggregate(&results);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[2].url, "https://s3.test");
    }

    #[test]
    fn test_prefix_tracking_pattern() {
        let params = vec!["utm_*".to_string()];
        assert!(is_tracking_param("UTM_Campaign", &params));
        assert!(!is_tracking_param("utmost", &params));
    }
}
