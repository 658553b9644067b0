//! Report rendering.

use crate::research::trace::ReasoningTrace;
use crate::types::{AppError, Report, Result, Stage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    /// The report and its citation list as pretty-printed JSON
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(AppError::InvalidInput(format!(
                "Unknown export format '{}'. Use 'markdown' or 'json'",
                other
            ))),
        }
    }
}

/// Render `report` as markdown: the body followed by a References section.
pub fn export(report: &Report) -> Result<String> {
    check_citations(report)?;

    let mut document = report.body_markdown.trim_end().to_string();
    document.push_str("\n\n## References\n\n");
    for source in &report.citations {
        document.push_str(&format!(
            "[{}] {} — {}\n",
            source.citation_index, source.title, source.url
        ));
    }
    Ok(document)
}

/// Citation indices must run 1, 2, 3, ... in list order.
fn check_citations(report: &Report) -> Result<()> {
    for (position, source) in report.citations.iter().enumerate() {
        if source.citation_index != position + 1 {
            return Err(AppError::InvalidInput(format!(
                "malformed report: citation at position {} has index {}",
                position + 1,
                source.citation_index
            )));
        }
    }
    Ok(())
}

/// Download name for a report, e.g. `research_impact_of_caffeine_o.md`.
pub fn export_filename(query: &str, format: ExportFormat) -> String {
    let stem: String = query
        .trim()
        .chars()
        .take(20)
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    format!("research_{}.{}", stem, format.extension())
}

#[derive(Debug, Clone, Copy)]
pub struct Exporter {
    format: ExportFormat,
    include_header: bool,
}

impl Default for Exporter {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            include_header: true,
        }
    }
}

impl Exporter {
    pub fn new(format: ExportFormat, include_header: bool) -> Self {
        Self {
            format,
            include_header,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        match self.format {
            ExportFormat::Markdown => {
                let document = export(report)?;
                if !self.include_header {
                    return Ok(document);
                }
                Ok(format!(
                    "# Research Report: {}\n\n*Generated on {}*\n\n{}",
                    report.query,
                    report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    document
                ))
            }
            ExportFormat::Json => {
                check_citations(report)?;
                serde_json::to_string_pretty(report)
                    .map_err(|e| AppError::Internal(format!("Failed to serialize report: {}", e)))
            }
        }
    }

    /// [`render`](Self::render), recording the outcome on `trace`.
    pub fn render_traced(&self, report: &Report, trace: &ReasoningTrace) -> Result<String> {
        let document = self.render(report)?;
        trace.record(
            Stage::Export,
            format!(
                "rendered {} report with {} reference{}",
                match self.format {
                    ExportFormat::Markdown => "markdown",
                    ExportFormat::Json => "json",
                },
                report.citations.len(),
                if report.citations.len() == 1 { "" } else { "s" }
            ),
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Query, Source};
    use chrono::Utc;

    fn report(indices: &[usize]) -> Report {
        Report {
            query: Query::new("impact of caffeine on sleep").unwrap(),
            body_markdown: "Caffeine delays sleep onset [1].\n".to_string(),
            citations: indices
                .iter()
                .map(|&i| Source {
                    citation_index: i,
                    url: format!("https://s{}.test", i),
                    normalized_url: format!("https://s{}.test", i),
                    title: format!("Source {}", i),
                    snippet: String::new(),
                    provider: "test".to_string(),
                    corroboration: 1,
                    best_rank: 1,
                    sub_question_ids: vec![1],
                })
                .collect(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_export_appends_references() {
        let document = export(&report(&[1, 2])).unwrap();
        assert_eq!(
            document,
            "Caffeine delays sleep onset [1].\n\n## References\n\n[1] Source 1 — https://s1.test\n[2] Source 2 — https://s2.test\n"
        );
    }

    #[test]
    fn test_export_rejects_gaps() {
        assert!(matches!(
            export(&report(&[1, 3])),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_header_and_json() {
        let report = report(&[1]);

        let markdown = Exporter::default().render(&report).unwrap();
        assert!(markdown.starts_with("# Research Report: impact of caffeine on sleep\n"));

        let json = Exporter::new(ExportFormat::Json, true).render(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["query"], "impact of caffeine on sleep");
        assert_eq!(value["citations"][0]["citation_index"], 1);
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("impact of caffeine on sleep", ExportFormat::Markdown),
            "research_impact_of_caffeine_o.md"
        );
        assert_eq!(export_filename("rust", ExportFormat::Json), "research_rust.json");
    }
}
