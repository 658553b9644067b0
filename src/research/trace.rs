//! Append-only reasoning trace shared by every stage of a run.
//!
//! Concurrent search workers append through a single writer lock. Timestamps
//! are taken while the lock is held and clamped to the previous entry, so the
//! log is a total order with non-decreasing timestamps even if the wall clock
//! steps backwards.

use crate::types::{ReasoningStep, Stage};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Callback invoked for every appended step, in trace order.
pub type TraceObserver = Arc<dyn Fn(&ReasoningStep) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ReasoningTrace {
    steps: Arc<Mutex<Vec<ReasoningStep>>>,
    observer: Option<TraceObserver>,
}

impl ReasoningTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trace that notifies `observer` as steps are appended
    pub fn with_observer(observer: TraceObserver) -> Self {
        Self {
            steps: Arc::default(),
            observer: Some(observer),
        }
    }

    pub fn record(&self, stage: Stage, summary: impl Into<String>) -> ReasoningStep {
        let mut steps = self.steps.lock();

        let now = Utc::now();
        let timestamp = steps.last().map_or(now, |last| last.timestamp.max(now));
        let step = ReasoningStep {
            stage,
            summary: summary.into(),
            timestamp,
        };
        steps.push(step.clone());

        info!(stage = %step.stage, "{}", step.summary);
        // Still under the lock so observers see steps in trace order
        if let Some(observer) = &self.observer {
            observer(&step);
        }

        step
    }

    /// Copy of the steps recorded so far
    pub fn snapshot(&self) -> Vec<ReasoningStep> {
        self.steps.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.lock().is_empty()
    }

    /// Steps recorded for a given stage, in order
    pub fn for_stage(&self, stage: Stage) -> Vec<ReasoningStep> {
        self.steps
            .lock()
            .iter()
            .filter(|s| s.stage == stage)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for ReasoningTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningTrace")
            .field("steps", &self.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
