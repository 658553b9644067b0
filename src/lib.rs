//! # delve - autonomous research agent
//!
//! Given a free-text question, delve decomposes it into sub-questions,
//! searches for each in parallel across a chain of search providers,
//! deduplicates and ranks the results, and writes a report whose every
//! citation points at a real source. Each decision along the way is recorded
//! in a reasoning trace.
//!
//! ## Overview
//!
//! delve can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `delve` binary
//! 2. **As a library** - Drive the pipeline from your own Rust code
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use delve::{ResearchConfig, Provider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResearchConfig::load_or_default("delve.toml")?;
//!
//!     let provider = Provider::Ollama {
//!         base_url: "http://localhost:11434".to_string(),
//!         model: "llama3.2".to_string(),
//!     };
//!     let llm = Arc::from(provider.create_client().await?);
//!
//!     let coordinator = config.build_coordinator(Some(llm))?;
//!     let outcome = coordinator.research("impact of caffeine on sleep").await?;
//!
//!     println!("{}", delve::research::exporter::export(&outcome.report)?);
//!     Ok(())
//! }
//! ```
//!
//! ### Stages on their own
//!
//! Every stage takes plain values and can be run in isolation:
//!
//! ```rust,ignore
//! use delve::research::aggregator::{Aggregator, AggregationConfig};
//!
//! let sources = Aggregator::new(AggregationConfig::default()).aggregate(&results);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama text generation (default) |
//! | `openai` | OpenAI and compatible APIs |
//! | `all-llm` | Both text-generation backends |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line parsing and terminal output.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// The research pipeline stages and their coordinator.
pub mod research;
/// Search provider adapters and the fallback chain.
pub mod search;
/// Core types (query, sources, report, trace steps, errors).
pub mod types;
/// Configuration loading.
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use research::coordinator::{ResearchCoordinator, ResearchOutcome, RunSettings};
pub use research::exporter::{ExportFormat, Exporter};
pub use research::trace::ReasoningTrace;
pub use search::{FallbackChain, SearchError, SearchProvider};
pub use types::{AppError, Query, Report, Result, RunFailure};
pub use utils::toml_config::{ConfigError, ResearchConfig};
