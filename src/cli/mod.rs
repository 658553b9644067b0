//! CLI module for delve
//!
//! Command-line parsing for the `delve` binary. Uses clap for argument
//! parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::research::exporter::ExportFormat;
use crate::research::planner::PlannerStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// delve - autonomous research agent
///
/// Decomposes a question into sub-questions, searches the web for each in
/// parallel, and writes a cited report.
#[derive(Parser, Debug)]
#[command(
    name = "delve",
    version,
    about = "delve - autonomous research agent",
    long_about = "Decomposes a question into sub-questions, searches for each in parallel with\n\
                  provider fallback, deduplicates the sources and writes a cited report.\n\n\
                  Use 'init' to write a starter delve.toml.",
    after_help = "EXAMPLES:\n    \
                  delve research \"impact of caffeine on sleep\"\n    \
                  delve research \"coral reef bleaching\" --depth 3 --output reefs.md\n    \
                  delve init                    # Write a default delve.toml\n    \
                  delve config --validate       # Check the configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "delve.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a question and print a cited report
    Research {
        /// The question to research
        query: String,

        /// Number of sub-questions to explore (overrides research.max_sub_questions)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=8))]
        depth: Option<u8>,

        /// Results requested per sub-question (overrides research.results_per_query)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
        sources: Option<u8>,

        /// How to decompose the query
        #[arg(long, value_parser = parse_planner)]
        planner: Option<PlannerStrategy>,

        /// Report format
        #[arg(short, long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not print the reasoning trace
        #[arg(long)]
        no_trace: bool,
    },

    /// Write a default delve.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing delve.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

fn parse_planner(value: &str) -> Result<PlannerStrategy, String> {
    value.parse().map_err(|e: crate::types::AppError| e.to_string())
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: crate::types::AppError| e.to_string())
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
