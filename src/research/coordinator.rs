use crate::{
    research::{
        aggregator::Aggregator,
        dispatcher::SearchDispatcher,
        planner::QueryPlanner,
        synthesizer::Synthesizer,
        trace::ReasoningTrace,
    },
    types::{
        AppError, ProviderExhaustedError, Query, Report, ReasoningStep, RunFailure, Source, Stage,
        SubQuestion,
    },
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Run-level limits shared by every stage.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_sub_questions: usize,
    /// Single deadline covering planning, search and synthesis
    pub deadline: Duration,
    /// Fall back to a sources-only report when synthesis fails
    pub allow_partial_report: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_sub_questions: 4,
            deadline: Duration::from_secs(90),
            allow_partial_report: true,
        }
    }
}

/// Everything a successful run hands back to the caller.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    pub report: Report,
    pub sub_questions: Vec<SubQuestion>,
    /// Aggregated sources before synthesis dropped uncited ones
    pub sources: Vec<Source>,
    pub failures: Vec<ProviderExhaustedError>,
    /// True when the report is the sources-only fallback
    pub partial: bool,
    pub trace: ReasoningTrace,
}

impl ResearchOutcome {
    pub fn steps(&self) -> Vec<ReasoningStep> {
        self.trace.snapshot()
    }
}

pub struct ResearchCoordinator {
    planner: QueryPlanner,
    dispatcher: SearchDispatcher,
    aggregator: Aggregator,
    synthesizer: Option<Synthesizer>,
    settings: RunSettings,
}

impl ResearchCoordinator {
    pub fn new(
        planner: QueryPlanner,
        dispatcher: SearchDispatcher,
        aggregator: Aggregator,
        synthesizer: Option<Synthesizer>,
        settings: RunSettings,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            aggregator,
            synthesizer,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Execute a full research run on a query
    pub async fn research(&self, query: &str) -> Result<ResearchOutcome, RunFailure> {
        self.research_with_trace(query, ReasoningTrace::new()).await
    }

    /// Execute a research run, appending to a caller-supplied trace (e.g. one
    /// with a live observer attached).
    pub async fn research_with_trace(
        &self,
        query: &str,
        trace: ReasoningTrace,
    ) -> Result<ResearchOutcome, RunFailure> {
        let run_id = Uuid::new_v4();
        let span = info_span!("research", run_id = %run_id);

        self.run(run_id, query, trace).instrument(span).await
    }

    async fn run(
        &self,
        run_id: Uuid,
        query: &str,
        trace: ReasoningTrace,
    ) -> Result<ResearchOutcome, RunFailure> {
        let deadline = Instant::now() + self.settings.deadline;
        let fail = |error: AppError, trace: &ReasoningTrace| RunFailure {
            error,
            trace: trace.snapshot(),
        };

        let query = match Query::new(query) {
            Ok(query) => query,
            Err(error) => {
                trace.record(Stage::Planning, format!("rejected query: {}", error));
                return Err(fail(error, &trace));
            }
        };
        info!(query = %query, "Starting research run");

        let sub_questions = self
            .planner
            .plan_until(&query, self.settings.max_sub_questions, &trace, Some(deadline))
            .await
            .map_err(|error| fail(error, &trace))?;

        let dispatched = self
            .dispatcher
            .dispatch_until(&sub_questions, &trace, deadline)
            .await;
        trace.record(
            Stage::Search,
            format!(
                "search finished: {} result{} across {} sub-question{}, {} exhausted",
                dispatched.total_results(),
                if dispatched.total_results() == 1 { "" } else { "s" },
                sub_questions.len(),
                if sub_questions.len() == 1 { "" } else { "s" },
                dispatched.failures.len()
            ),
        );

        let sources = self.aggregator.aggregate_traced(&dispatched.results, &trace);

        let synthesized = match &self.synthesizer {
            Some(synthesizer) => {
                synthesizer
                    .synthesize_until(&query, &sub_questions, &sources, &trace, Some(deadline))
                    .await
            }
            None => Err(AppError::Synthesis(
                "no text-generation capability configured".to_string(),
            )),
        };

        let (report, partial) = match synthesized {
            Ok(report) => (report, false),
            Err(error) if self.settings.allow_partial_report => {
                warn!("Synthesis failed, returning sources-only report: {}", error);
                trace.record(
                    Stage::Synthesis,
                    format!(
                        "{}; returning a sources-only report with {} source{}",
                        error,
                        sources.len(),
                        if sources.len() == 1 { "" } else { "s" }
                    ),
                );
                (Report::sources_only(query.clone(), sources.clone()), true)
            }
            Err(error) => {
                trace.record(Stage::Synthesis, format!("run failed: {}", error));
                return Err(fail(error, &trace));
            }
        };

        info!(
            citations = report.citations.len(),
            partial, "Research run complete"
        );

        Ok(ResearchOutcome {
            run_id,
            report,
            sub_questions,
            sources,
            failures: dispatched.failures,
            partial,
            trace,
        })
    }
}
