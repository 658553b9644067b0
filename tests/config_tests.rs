//! Integration tests for delve.toml loading
//!
//! Exercises file handling, defaults, validation and pipeline assembly.

use delve::research::planner::PlannerStrategy;
use delve::utils::toml_config::{ConfigError, LlmConfig, ResearchConfig, SearchProviderConfig};
use delve::{ExportFormat, LLMClient, Result};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("delve.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

struct NullLlm;

#[async_trait::async_trait]
impl LLMClient for NullLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        Ok(String::new())
    }

    fn model_name(&self) -> &str {
        "null"
    }
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let result = ResearchConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = ResearchConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.research.max_sources, 12);
    assert_eq!(config.search.providers[0], SearchProviderConfig::DuckDuckGo);
}

#[test]
fn test_load_partial_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r#"
[research]
deadline_secs = 30

[[search.providers]]
type = "wikipedia"

[llm]
type = "ollama"
model = "qwen3:4b"
"#,
    );

    let config = ResearchConfig::load(&path).unwrap();
    assert_eq!(config.research.deadline_secs, 30);
    assert_eq!(config.research.worker_limit, 4);
    assert_eq!(config.search.providers.len(), 1);
    match &config.search.providers[0] {
        SearchProviderConfig::Wikipedia {
            base_url,
            timeout_secs,
            ..
        } => {
            assert_eq!(base_url, "https://en.wikipedia.org");
            assert_eq!(*timeout_secs, 10);
        }
        other => panic!("Expected wikipedia provider, got {:?}", other),
    }
    assert_eq!(
        config.llm,
        Some(LlmConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen3:4b".to_string(),
        })
    );
    assert_eq!(config.run_settings().deadline.as_secs(), 30);
}

#[test]
fn test_invalid_toml_is_parse_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "[research\nmax_sources = ");
    assert!(matches!(
        ResearchConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_unknown_provider_type_is_parse_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "[[search.providers]]\ntype = \"altavista\"\n");
    assert!(matches!(
        ResearchConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_invalid_wikipedia_url_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        "[[search.providers]]\ntype = \"wikipedia\"\nbase_url = \"not a url\"\n",
    );
    assert!(matches!(
        ResearchConfig::load(&path),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_export_settings() {
    let config = ResearchConfig::from_toml("[export]\nformat = \"json\"\n").unwrap();
    assert_eq!(config.exporter().format(), ExportFormat::Json);
    assert!(config.export.include_header);
}

#[test]
fn test_build_coordinator() {
    let config = ResearchConfig::from_toml(
        "[planner]\nstrategy = \"llm\"\n[llm]\ntype = \"ollama\"\n[research]\nmax_sub_questions = 2\n",
    )
    .unwrap();
    assert_eq!(config.planner.strategy, PlannerStrategy::Llm);

    let llm: Arc<dyn LLMClient> = Arc::new(NullLlm);
    let coordinator = config.build_coordinator(Some(llm)).unwrap();
    assert_eq!(coordinator.settings().max_sub_questions, 2);

    assert!(matches!(
        config.build_coordinator(None),
        Err(ConfigError::ValidationError(_))
    ));
}
