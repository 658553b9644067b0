//! TOML-based configuration for delve
//!
//! Declarative settings for the research pipeline, the search fallback chain
//! and the text-generation backend, loaded from `delve.toml`. Every field has
//! a default, so an empty file (or no file at all) is a working setup.
//!
//! Environment variables are only ever *named* here. Resolving them is left
//! to the caller, which passes the resolved key to [`LlmConfig::to_provider`].

use crate::llm::{LLMClient, Provider};
use crate::research::aggregator::{AggregationConfig, Aggregator, DEFAULT_TRACKING_PARAMS};
use crate::research::coordinator::{ResearchCoordinator, RunSettings};
use crate::research::dispatcher::{DispatchConfig, SearchDispatcher};
use crate::research::exporter::{ExportFormat, Exporter};
use crate::research::planner::{PlannerStrategy, QueryPlanner};
use crate::research::synthesizer::Synthesizer;
use crate::search::{DuckDuckGoProvider, FallbackChain, WikipediaProvider, WikipediaSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Root configuration structure loaded from delve.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub research: RunConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub aggregation: AggregationSettings,

    #[serde(default)]
    pub search: SearchConfig,

    /// Text-generation backend; without it reports are sources-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    #[serde(default)]
    pub export: ExportConfig,
}

// ============= Run Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_sub_questions")]
    pub max_sub_questions: usize,

    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,

    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    #[serde(default = "default_true")]
    pub allow_partial_report: bool,

    #[serde(default = "default_true")]
    pub fallback_on_empty: bool,
}

fn default_max_sub_questions() -> usize {
    4
}

fn default_results_per_query() -> usize {
    3
}

fn default_worker_limit() -> usize {
    4
}

fn default_attempt_timeout_secs() -> u64 {
    10
}

fn default_deadline_secs() -> u64 {
    90
}

fn default_max_sources() -> usize {
    12
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_sub_questions: default_max_sub_questions(),
            results_per_query: default_results_per_query(),
            worker_limit: default_worker_limit(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            deadline_secs: default_deadline_secs(),
            max_sources: default_max_sources(),
            allow_partial_report: true,
            fallback_on_empty: true,
        }
    }
}

// ============= Planner / Aggregation Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub strategy: PlannerStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Query parameters dropped when comparing URLs; `utm_*` style prefixes allowed
    #[serde(default = "default_tracking_params")]
    pub tracking_params: Vec<String>,
}

fn default_tracking_params() -> Vec<String> {
    DEFAULT_TRACKING_PARAMS.iter().map(|s| s.to_string()).collect()
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            tracking_params: default_tracking_params(),
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Fallback chain, tried in order
    #[serde(default = "default_search_providers")]
    pub providers: Vec<SearchProviderConfig>,
}

fn default_search_providers() -> Vec<SearchProviderConfig> {
    vec![
        SearchProviderConfig::DuckDuckGo,
        SearchProviderConfig::Wikipedia {
            base_url: default_wikipedia_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_wikipedia_timeout(),
        },
    ]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: default_search_providers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchProviderConfig {
    DuckDuckGo,
    Wikipedia {
        #[serde(default = "default_wikipedia_url")]
        base_url: String,
        #[serde(default = "default_user_agent")]
        user_agent: String,
        #[serde(default = "default_wikipedia_timeout")]
        timeout_secs: u64,
    },
}

fn default_wikipedia_url() -> String {
    "https://en.wikipedia.org".to_string()
}

fn default_user_agent() -> String {
    format!("delve/{}", env!("CARGO_PKG_VERSION"))
}

fn default_wikipedia_timeout() -> u64 {
    10
}

impl SearchProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            SearchProviderConfig::DuckDuckGo => crate::search::duckduckgo::PROVIDER_NAME,
            SearchProviderConfig::Wikipedia { .. } => crate::search::wikipedia::PROVIDER_NAME,
        }
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl LlmConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmConfig::Ollama { .. } => "ollama",
            LlmConfig::OpenAI { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmConfig::Ollama { model, .. } | LlmConfig::OpenAI { model, .. } => model,
        }
    }

    /// Name of the environment variable holding the API key, if one is needed
    pub fn api_key_env(&self) -> Option<&str> {
        match self {
            LlmConfig::Ollama { .. } => None,
            LlmConfig::OpenAI { api_key_env, .. } => Some(api_key_env),
        }
    }

    /// Build a provider description from this config and an already resolved key.
    pub fn to_provider(&self, api_key: Option<String>) -> Result<Provider, ConfigError> {
        match self {
            LlmConfig::Ollama { base_url, model } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
            }),
            LlmConfig::OpenAI {
                api_key_env,
                api_base,
                model,
            } => {
                let api_key =
                    api_key.ok_or_else(|| ConfigError::MissingEnvVar(api_key_env.clone()))?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.clone(),
                })
            }
        }
    }
}

// ============= Export Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,

    /// Prepend `# Research Report: ...` and the generation time
    #[serde(default = "default_true")]
    pub include_header: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            include_header: true,
        }
    }
}

// ============= Errors and Warnings =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to render TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

/// Non-fatal configuration issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarningKind {
    NoTextGeneration,
    DuplicateProvider,
    AttemptExceedsDeadline,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResearchConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from {}", path.display());

        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::FileNotFound(path)) => {
                debug!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ResearchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("research.max_sub_questions", self.research.max_sub_questions as u64),
            ("research.results_per_query", self.research.results_per_query as u64),
            ("research.worker_limit", self.research.worker_limit as u64),
            ("research.attempt_timeout_secs", self.research.attempt_timeout_secs),
            ("research.deadline_secs", self.research.deadline_secs),
            ("research.max_sources", self.research.max_sources as u64),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }

        if self.search.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "search.providers must list at least one provider".to_string(),
            ));
        }

        for provider in &self.search.providers {
            if let SearchProviderConfig::Wikipedia {
                base_url,
                timeout_secs,
                ..
            } = provider
            {
                url::Url::parse(base_url).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "Invalid wikipedia base_url '{}': {}",
                        base_url, e
                    ))
                })?;
                if *timeout_secs == 0 {
                    return Err(ConfigError::ValidationError(
                        "wikipedia timeout_secs must be at least 1".to_string(),
                    ));
                }
            }
        }

        if self.planner.strategy == PlannerStrategy::Llm && self.llm.is_none() {
            return Err(ConfigError::ValidationError(
                "planner.strategy = \"llm\" requires an [llm] section".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate and collect warnings about settings that work but look unintended
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();

        if self.llm.is_none() {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::NoTextGeneration,
                message: "No [llm] section; reports will list sources without a narrative"
                    .to_string(),
            });
        }

        let mut seen = HashSet::new();
        for provider in &self.search.providers {
            if !seen.insert(provider.name()) {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::DuplicateProvider,
                    message: format!(
                        "Search provider '{}' appears more than once in the fallback chain",
                        provider.name()
                    ),
                });
            }
        }

        if self.research.attempt_timeout_secs > self.research.deadline_secs {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::AttemptExceedsDeadline,
                message: format!(
                    "attempt_timeout_secs ({}) exceeds deadline_secs ({}); the run deadline will cut attempts short",
                    self.research.attempt_timeout_secs, self.research.deadline_secs
                ),
            });
        }

        Ok(warnings)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            max_sub_questions: self.research.max_sub_questions,
            deadline: Duration::from_secs(self.research.deadline_secs),
            allow_partial_report: self.research.allow_partial_report,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            worker_limit: self.research.worker_limit,
            attempt_timeout: Duration::from_secs(self.research.attempt_timeout_secs),
            deadline: Duration::from_secs(self.research.deadline_secs),
            results_per_query: self.research.results_per_query,
            fallback_on_empty: self.research.fallback_on_empty,
        }
    }

    pub fn aggregation_config(&self) -> AggregationConfig {
        AggregationConfig {
            max_sources: self.research.max_sources,
            tracking_params: self.aggregation.tracking_params.clone(),
        }
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.export.format, self.export.include_header)
    }

    /// Instantiate the configured search providers, in chain order
    pub fn build_chain(&self) -> Result<FallbackChain, ConfigError> {
        let mut chain = FallbackChain::new();
        for provider in &self.search.providers {
            match provider {
                SearchProviderConfig::DuckDuckGo => chain.push(Arc::new(DuckDuckGoProvider::new())),
                SearchProviderConfig::Wikipedia {
                    base_url,
                    user_agent,
                    timeout_secs,
                } => {
                    let wikipedia = WikipediaProvider::new(WikipediaSettings {
                        base_url: base_url.clone(),
                        user_agent: user_agent.clone(),
                        timeout: Duration::from_secs(*timeout_secs),
                    })
                    .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
                    chain.push(Arc::new(wikipedia));
                }
            }
        }
        Ok(chain)
    }

    /// Assemble the full pipeline around an optional text-generation client.
    pub fn build_coordinator(
        &self,
        llm: Option<Arc<dyn LLMClient>>,
    ) -> Result<ResearchCoordinator, ConfigError> {
        let planner = match (self.planner.strategy, &llm) {
            (PlannerStrategy::Template, _) => QueryPlanner::template(),
            (PlannerStrategy::Llm, Some(llm)) => QueryPlanner::with_llm(Arc::clone(llm)),
            (PlannerStrategy::Llm, None) => {
                return Err(ConfigError::ValidationError(
                    "planner.strategy = \"llm\" requires a text-generation client".to_string(),
                ));
            }
        };

        Ok(ResearchCoordinator::new(
            planner,
            SearchDispatcher::new(self.build_chain()?, self.dispatch_config()),
            Aggregator::new(self.aggregation_config()),
            llm.map(Synthesizer::new),
            self.run_settings(),
        ))
    }
}
