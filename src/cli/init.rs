//! Init command implementation
//!
//! Writes a commented starter `delve.toml` and `.env.example`.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// delve.toml already exists and --force was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing delve");

    if let Err(e) = fs::create_dir_all(&config.path) {
        output.error(&format!("Failed to create {}: {}", config.path.display(), e));
        return InitResult::Error(e.to_string());
    }

    let config_path = config.path.join("delve.toml");
    if config_path.exists() && !config.force {
        output.warning("delve.toml already exists!");
        output.hint("Use --force to overwrite it");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = write_file(&config_path, DEFAULT_CONFIG, config.force) {
        output.error(&format!("Failed to create delve.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "delve.toml");

    let env_example_path = config.path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, ENV_EXAMPLE, config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    output.complete("delve initialized");

    output.header("Next Steps");
    output.newline();
    output.info("1. Start Ollama for narrative reports (optional):");
    output.command("ollama serve");
    output.command("ollama pull llama3.2");
    output.newline();
    output.info("2. Run a query:");
    output.command("delve research \"impact of caffeine on sleep\"");

    output.hint("Without a reachable model, delve prints a sources-only report");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

/// Starter configuration; every value shown is the built-in default unless noted.
pub const DEFAULT_CONFIG: &str = r#"# delve configuration
# Every setting is optional; omitted values fall back to the defaults shown.

[research]
max_sub_questions = 4      # sub-questions per query
results_per_query = 3      # hits requested from each provider
worker_limit = 4           # sub-questions searched concurrently
attempt_timeout_secs = 10  # per provider attempt
deadline_secs = 90         # whole run: planning, search and synthesis
max_sources = 12           # sources kept after ranking
allow_partial_report = true
fallback_on_empty = true   # an empty result list moves on to the next provider

[planner]
# "template" uses fixed research angles, "llm" asks the model (needs [llm])
strategy = "template"

[aggregation]
tracking_params = ["utm_*", "fbclid", "gclid", "mc_cid", "mc_eid", "ref"]

# Fallback chain, tried in order for every sub-question
[[search.providers]]
type = "duckduckgo"

[[search.providers]]
type = "wikipedia"
base_url = "https://en.wikipedia.org"
timeout_secs = 10

# Text generation for planning and synthesis (not a default; remove to disable)
[llm]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2"

# OpenAI or a compatible API (build with --features openai)
# [llm]
# type = "openai"
# api_key_env = "OPENAI_API_KEY"
# api_base = "https://api.openai.com/v1"
# model = "gpt-4o-mini"

[export]
format = "markdown"        # or "json"
include_header = true
"#;

const ENV_EXAMPLE: &str = r#"# delve environment variables
# Copy this file to .env and fill in the values.

# Logging level (trace, debug, info, warn, error)
RUST_LOG=info

# Only needed with an openai [llm] section
# OPENAI_API_KEY=sk-...
"#;
