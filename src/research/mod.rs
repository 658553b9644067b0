//! The research pipeline.
//!
//! A run moves through five stages, each usable on its own with fixed input:
//!
//! 1. [`planner::QueryPlanner`] - decompose the query into sub-questions
//! 2. [`dispatcher::SearchDispatcher`] - search every sub-question in
//!    parallel, walking a provider fallback chain
//! 3. [`aggregator::Aggregator`] - deduplicate and rank results into sources
//! 4. [`synthesizer::Synthesizer`] - write a cited narrative report
//! 5. [`exporter::Exporter`] - render the report with its references
//!
//! [`coordinator::ResearchCoordinator`] wires stages 1-4 together under a
//! single run deadline. Every stage appends to a shared
//! [`trace::ReasoningTrace`].
//!
//! # Usage
//!
//! ```ignore
//! use delve::research::coordinator::ResearchCoordinator;
//!
//! let outcome = coordinator.research("impact of caffeine on sleep").await?;
//! println!("{}", delve::research::exporter::export(&outcome.report)?);
//! for step in outcome.steps() {
//!     println!("[{}] {}", step.stage, step.summary);
//! }
//! ```

pub mod aggregator;
pub mod coordinator;
pub mod dispatcher;
pub mod exporter;
pub mod planner;
pub mod synthesizer;
pub mod trace;
