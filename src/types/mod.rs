use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============= Run Input Types =============

/// The user's research question. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Accept a query, rejecting empty or whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::Planning("query is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decomposed facet of a [`Query`], searched independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    /// 1-based ordinal within the run
    pub id: usize,
    pub text: String,
    pub originating_query: Query,
}

// ============= Search Types =============

/// A raw hit as returned by a search provider, before the dispatcher
/// attaches sub-question and rank information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub sub_question_id: usize,
    pub provider: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// 1-based position in the provider's response
    pub rank: usize,
}

/// A deduplicated, ranked search result that can be cited in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// 1-based citation number
    pub citation_index: usize,
    pub url: String,
    /// Deduplication key derived from `url`
    pub normalized_url: String,
    pub title: String,
    pub snippet: String,
    pub provider: String,
    /// Number of distinct sub-questions that surfaced this URL
    pub corroboration: usize,
    pub best_rank: usize,
    pub sub_question_ids: Vec<usize>,
}

// ============= Reasoning Trace Types =============

/// Pipeline stage a reasoning step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planning,
    Search,
    Aggregation,
    Synthesis,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Search => "search",
            Stage::Aggregation => "aggregation",
            Stage::Synthesis => "synthesis",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub stage: Stage,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

// ============= Report Types =============

/// Final output of a research run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub query: Query,
    pub body_markdown: String,
    pub citations: Vec<Source>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Build a narrative-free report listing every source, each cited once.
    ///
    /// Used when synthesis fails and the caller opted into partial reports.
    pub fn sources_only(query: Query, sources: Vec<Source>) -> Self {
        let citations: Vec<Source> = sources
            .into_iter()
            .enumerate()
            .map(|(i, mut source)| {
                source.citation_index = i + 1;
                source
            })
            .collect();

        let mut body = String::from(
            "Narrative synthesis was unavailable for this run. Sources gathered:\n\n",
        );
        if citations.is_empty() {
            body.push_str("- No sources were found.\n");
        }
        for source in &citations {
            body.push_str(&format!(
                "- **{}**: {} [{}]\n",
                source.title,
                source.snippet.trim(),
                source.citation_index
            ));
        }

        Self {
            query,
            body_markdown: body,
            citations,
            generated_at: Utc::now(),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Recorded (never raised) when every provider in the fallback chain failed
/// for one sub-question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("all {attempts} provider(s) failed for sub-question {sub_question_id}: {last_error}")]
pub struct ProviderExhaustedError {
    pub sub_question_id: usize,
    pub attempts: usize,
    pub last_error: String,
}

/// A fatal run failure together with the trace accumulated before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: AppError,
    pub trace: Vec<ReasoningStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, url: &str) -> Source {
        Source {
            citation_index: 9,
            url: url.to_string(),
            normalized_url: url.to_string(),
            title: title.to_string(),
            snippet: "snippet".to_string(),
            provider: "test".to_string(),
            corroboration: 1,
            best_rank: 1,
            sub_question_ids: vec![1],
        }
    }

    #[test]
    fn test_query_rejects_blank() {
        assert!(matches!(Query::new("   "), Err(AppError::Planning(_))));
        assert_eq!(Query::new("  caffeine ").unwrap().as_str(), "caffeine");
    }

    #[test]
    fn test_sources_only_cites_every_source() {
        let query = Query::new("q").unwrap();
        let report = Report::sources_only(
            query,
            vec![source("A", "https://a.test"), source("B", "https://b.test")],
        );

        assert_eq!(report.citations.len(), 2);
        assert_eq!(report.citations[0].citation_index, 1);
        assert_eq!(report.citations[1].citation_index, 2);
        assert!(report.body_markdown.contains("[1]"));
        assert!(report.body_markdown.contains("[2]"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Search.to_string(), "search");
    }
}
