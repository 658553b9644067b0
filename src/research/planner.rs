//! Query decomposition into sub-questions.

use crate::llm::LLMClient;
use crate::research::trace::ReasoningTrace;
use crate::types::{AppError, Query, Result, Stage, SubQuestion};
use serde::{Deserialize, Serialize};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tokio::time::Instant;
use tracing::warn;

/// How the planner produces candidate sub-questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlannerStrategy {
    /// Ask the language model for focused research questions
    Llm,
    /// Fixed research angles; needs no language model
    #[default]
    Template,
}

impl std::str::FromStr for PlannerStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "template" => Ok(Self::Template),
            other => Err(AppError::InvalidInput(format!(
                "Unknown planner strategy '{}'. Use 'llm' or 'template'",
                other
            ))),
        }
    }
}

pub struct QueryPlanner {
    strategy: PlannerStrategy,
    llm: Option<Arc<dyn LLMClient>>,
}

impl QueryPlanner {
    pub fn template() -> Self {
        Self {
            strategy: PlannerStrategy::Template,
            llm: None,
        }
    }

    pub fn with_llm(llm: Arc<dyn LLMClient>) -> Self {
        Self {
            strategy: PlannerStrategy::Llm,
            llm: Some(llm),
        }
    }

    pub fn strategy(&self) -> PlannerStrategy {
        self.strategy
    }

    /// Decompose `query` into 1..=`max_sub_questions` distinct sub-questions.
    pub async fn plan(
        &self,
        query: &Query,
        max_sub_questions: usize,
        trace: &ReasoningTrace,
    ) -> Result<Vec<SubQuestion>> {
        self.plan_until(query, max_sub_questions, trace, None).await
    }

    /// Like [`plan`](Self::plan), but gives up on the language model at
    /// `deadline` and falls back to the original query.
    pub async fn plan_until(
        &self,
        query: &Query,
        max_sub_questions: usize,
        trace: &ReasoningTrace,
        deadline: Option<Instant>,
    ) -> Result<Vec<SubQuestion>> {
        if max_sub_questions == 0 {
            return Err(AppError::Planning(
                "max_sub_questions must be at least 1".to_string(),
            ));
        }

        let (candidates, unusable_reason) = match self.strategy {
            PlannerStrategy::Template => (template_angles(query.as_str()), None),
            PlannerStrategy::Llm => match self.generate_candidates(query, max_sub_questions, deadline).await {
                Ok(candidates) if candidates.is_empty() => {
                    (candidates, Some("model returned no usable questions".to_string()))
                }
                Ok(candidates) => (candidates, None),
                Err(reason) => {
                    warn!("Query decomposition failed: {}", reason);
                    (Vec::new(), Some(reason))
                }
            },
        };

        let mut texts = distinct_case_insensitive(candidates);
        texts.truncate(max_sub_questions);

        let summary_prefix = if texts.is_empty() {
            texts.push(query.as_str().to_string());
            format!(
                "decomposition unavailable ({}); using the original query as the sole sub-question",
                unusable_reason.unwrap_or_else(|| "no candidates".to_string())
            )
        } else {
            format!(
                "decomposed query into {} sub-question{} ({} strategy)",
                texts.len(),
                if texts.len() == 1 { "" } else { "s" },
                match self.strategy {
                    PlannerStrategy::Llm => "llm",
                    PlannerStrategy::Template => "template",
                }
            )
        };

        let sub_questions: Vec<SubQuestion> = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| SubQuestion {
                id: i + 1,
                text,
                originating_query: query.clone(),
            })
            .collect();

        let listing = sub_questions
            .iter()
            .map(|sq| format!("{}) {}", sq.id, sq.text))
            .collect::<Vec<_>>()
            .join("; ");
        trace.record(Stage::Planning, format!("{}: {}", summary_prefix, listing));

        Ok(sub_questions)
    }

    async fn generate_candidates(
        &self,
        query: &Query,
        max_sub_questions: usize,
        deadline: Option<Instant>,
    ) -> std::result::Result<Vec<String>, String> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| "no language model configured".to_string())?;

        let prompt = format!(
            r#"Generate {} focused research questions to comprehensively answer: {}

Return only the questions, one per line, numbered 1-{}.

Example:

1. [QUESTION 1]
2. [QUESTION 2]
3. [QUESTION 3]
..."#,
            max_sub_questions,
            query.as_str(),
            max_sub_questions
        );

        let response = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, llm.generate(&prompt))
                .await
                .map_err(|_| "run deadline reached while planning".to_string())?,
            None => llm.generate(&prompt).await,
        };

        response
            .map(|text| parse_questions(&text))
            .map_err(|e| e.to_string())
    }
}

static LIST_MARKER: OnceLock<Regex> = OnceLock::new();

/// `1.`, `2)`, `-`, `*`, `•` or a markdown heading prefix
fn list_marker() -> &'static Regex {
    LIST_MARKER.get_or_init(|| {
        Regex::new(r"^(?:\d{1,2}[.)]\s+|[-*•]\s+|#+\s*)").expect("static list marker pattern")
    })
}

/// The fixed research angles used when no language model drives planning.
pub fn template_angles(query: &str) -> Vec<String> {
    vec![
        format!("What is the current state of {}?", query),
        format!("What are the recent developments in {}?", query),
        format!("What are the key challenges in {}?", query),
        format!("What solutions exist for {}?", query),
    ]
}

/// Extract one question per line from a model response, dropping numbering,
/// bullets, wrapping quotes and header lines.
pub fn parse_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            let line = line.trim();
            list_marker()
                .replace(line, "")
                .trim()
                .trim_matches(|c| c == '"' || c == '`')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty() && !line.ends_with(':') && !line.starts_with('['))
        .collect()
}

fn distinct_case_insensitive(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .collect()
}
