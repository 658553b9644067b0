//! Citation-aware report synthesis.
//!
//! The language model writes the narrative; this module keeps its citations
//! honest. Markers pointing at unknown sources are stripped, sources never
//! cited are dropped, and the survivors are renumbered `1..` in the order the
//! text first cites them.

use crate::llm::LLMClient;
use crate::research::trace::ReasoningTrace;
use crate::types::{AppError, Query, Report, Result, Source, Stage, SubQuestion};
use chrono::Utc;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::time::Instant;

static MARKER: OnceLock<Regex> = OnceLock::new();

/// `[3]`, `[1, 4]` and the spaces around them. Line breaks are never part
/// of a match, and four-digit numbers such as `[2024]` are not markers.
fn marker_regex() -> &'static Regex {
    MARKER.get_or_init(|| {
        Regex::new(r"([ \t]*)\[(\d{1,3}(?:[ \t]*,[ \t]*\d{1,3})*)\]([ \t]*)")
            .expect("static marker pattern")
    })
}

/// Rules for the model's citations; the per-run material goes in the prompt.
pub const SYSTEM_PROMPT: &str = "You are a research assistant writing cited markdown reports. \
Cite sources inline with their bracketed number, for example [1] or [2][3]. \
Only cite numbers from the source list. Do not add a references section.";

/// Outcome of reconciling generated text with the source list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationResolution {
    pub body: String,
    /// Cited sources renumbered in first-reference order
    pub citations: Vec<Source>,
    /// Marker indices that matched no source, in order of appearance
    pub stripped: Vec<usize>,
}

/// Rewrite citation markers in `text` against `sources`.
pub fn resolve_citations(text: &str, sources: &[Source]) -> CitationResolution {
    let known: HashMap<usize, &Source> = sources.iter().map(|s| (s.citation_index, s)).collect();
    let mut renumbered: HashMap<usize, usize> = HashMap::new();
    let mut order: Vec<usize> = Vec::new();
    let mut stripped = Vec::new();

    for caps in marker_regex().captures_iter(text) {
        for index in marker_indices(&caps) {
            if known.contains_key(&index) {
                renumbered.entry(index).or_insert_with(|| {
                    order.push(index);
                    order.len()
                });
            } else {
                stripped.push(index);
            }
        }
    }

    let body = marker_regex().replace_all(text, |caps: &Captures| {
        let mut numbers: Vec<usize> = marker_indices(caps)
            .into_iter()
            .filter_map(|index| renumbered.get(&index).copied())
            .collect();
        numbers.dedup();

        if numbers.is_empty() {
            // Keep one separator mid-line; drop the marker's spacing at a line start
            let start = caps.get(0).map_or(0, |m| m.start());
            let line_start = start == 0 || text[..start].ends_with('\n');
            return if line_start {
                String::new()
            } else {
                caps[3].to_string()
            };
        }
        let markers: String = numbers.iter().map(|n| format!("[{}]", n)).collect();
        format!("{}{}{}", &caps[1], markers, &caps[3])
    });

    let citations = order
        .iter()
        .enumerate()
        .map(|(i, index)| {
            let mut source = known[index].clone();
            source.citation_index = i + 1;
            source
        })
        .collect();

    CitationResolution {
        body: body.trim().to_string(),
        citations,
        stripped,
    }
}

fn marker_indices(caps: &Captures) -> Vec<usize> {
    caps[2]
        .split(',')
        .filter_map(|n| n.trim().parse().ok())
        .collect()
}

/// Prompt listing the query, its sub-questions and every indexed source.
pub fn build_prompt(query: &Query, sub_questions: &[SubQuestion], sources: &[Source]) -> String {
    let angles = sub_questions
        .iter()
        .map(|sq| format!("{}. {}", sq.id, sq.text))
        .collect::<Vec<_>>()
        .join("\n");

    let source_list = if sources.is_empty() {
        "(no sources were found)".to_string()
    } else {
        sources
            .iter()
            .map(|s| format!("[{}] {}\n{}", s.citation_index, s.title, s.snippet.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        r#"Original query: {}

Research angles:
{}

Sources:
{}

Synthesize these sources into a comprehensive, well-structured markdown answer. Include:
1. Direct answer to the question
2. Key insights for each research angle
3. Supporting evidence
4. Caveats or limitations if any"#,
        query, angles, source_list
    )
}

pub struct Synthesizer {
    llm: Arc<dyn LLMClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        query: &Query,
        sub_questions: &[SubQuestion],
        sources: &[Source],
        trace: &ReasoningTrace,
    ) -> Result<Report> {
        self.synthesize_until(query, sub_questions, sources, trace, None)
            .await
    }

    /// Like [`synthesize`](Self::synthesize), failing once `deadline` passes.
    pub async fn synthesize_until(
        &self,
        query: &Query,
        sub_questions: &[SubQuestion],
        sources: &[Source],
        trace: &ReasoningTrace,
        deadline: Option<Instant>,
    ) -> Result<Report> {
        let prompt = build_prompt(query, sub_questions, sources);

        let request = self.llm.generate_with_system(SYSTEM_PROMPT, &prompt);
        let generated = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, request)
                .await
                .map_err(|_| {
                    AppError::Synthesis("run deadline reached during text generation".to_string())
                })?,
            None => request.await,
        }
        .map_err(|e| AppError::Synthesis(format!("text generation unavailable: {}", e)))?;

        if generated.trim().is_empty() {
            return Err(AppError::Synthesis(
                "text generation returned empty text".to_string(),
            ));
        }

        let resolution = resolve_citations(&generated, sources);

        if !resolution.stripped.is_empty() {
            trace.record(
                Stage::Synthesis,
                format!(
                    "stripped {} citation marker{} referencing unknown sources: {:?}",
                    resolution.stripped.len(),
                    if resolution.stripped.len() == 1 { "" } else { "s" },
                    resolution.stripped
                ),
            );
        }
        if resolution.body.is_empty() {
            return Err(AppError::Synthesis(
                "generated text was empty after citation cleanup".to_string(),
            ));
        }

        trace.record(
            Stage::Synthesis,
            format!(
                "synthesized report with {} model citing {} of {} sources",
                self.llm.model_name(),
                resolution.citations.len(),
                sources.len()
            ),
        );

        Ok(Report {
            query: query.clone(),
            body_markdown: resolution.body,
            citations: resolution.citations,
            generated_at: Utc::now(),
        })
    }
}
