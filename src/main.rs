use anyhow::{Context, anyhow};
use delve::{
    cli::{
        Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    llm::LLMClient,
    research::{exporter::export_filename, planner::PlannerStrategy, trace::ReasoningTrace},
    types::ReasoningStep,
    utils::toml_config::ResearchConfig,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(cli.verbose, cli.log_json);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init { path, force } => match init::run(InitConfig { path, force }, &output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(ExitCode::SUCCESS),
            InitResult::Error(e) => Err(anyhow!(e)),
        },
        Commands::Config { validate } => cmd_config(&cli.config, validate, &output),
        Commands::Research {
            query,
            depth,
            sources,
            planner,
            format,
            output: report_path,
            no_trace,
        } => {
            let mut config = ResearchConfig::load_or_default(&cli.config)
                .with_context(|| format!("Failed to load {}", cli.config.display()))?;

            if let Some(depth) = depth {
                config.research.max_sub_questions = depth as usize;
            }
            if let Some(sources) = sources {
                config.research.results_per_query = sources as usize;
            }
            if let Some(planner) = planner {
                config.planner.strategy = planner;
            }
            if let Some(format) = format {
                config.export.format = format;
            }
            config.validate()?;

            cmd_research(&config, &query, report_path, no_trace, &output).await
        }
    }
}

/// Logs go to stderr; the live trace is printed separately, so the default
/// level stays quiet.
fn init_logging(verbose: bool, json: bool) {
    let default_filter = if verbose { "delve=debug,info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn cmd_research(
    config: &ResearchConfig,
    query: &str,
    report_path: Option<PathBuf>,
    no_trace: bool,
    output: &Output,
) -> anyhow::Result<ExitCode> {
    let llm = connect_llm(config, output).await?;
    let coordinator = config.build_coordinator(llm)?;

    let trace = if no_trace {
        ReasoningTrace::new()
    } else {
        output.header("Reasoning");
        let colored = output.colored;
        ReasoningTrace::with_observer(Arc::new(move |step: &ReasoningStep| {
            Output { colored }.trace_step(step)
        }))
    };

    let outcome = match coordinator.research_with_trace(query, trace).await {
        Ok(outcome) => outcome,
        Err(failure) => {
            output.error(&format!("Research failed: {}", failure.error));
            if no_trace {
                output.header("Reasoning");
                for step in &failure.trace {
                    output.trace_step(step);
                }
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let exporter = config.exporter();
    let document = exporter.render_traced(&outcome.report, &outcome.trace)?;

    output.newline();
    if outcome.partial {
        output.warning("Narrative synthesis was unavailable; the report lists sources only");
    }
    for failure in &outcome.failures {
        output.warning(&failure.to_string());
    }

    match report_path {
        Some(path) => {
            let path = resolve_report_path(path, query, config);
            std::fs::write(&path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.created("report", &path.display().to_string());
        }
        None => println!("{}", document),
    }

    output.success(&format!(
        "{} source{} cited from {} sub-question{}",
        outcome.report.citations.len(),
        if outcome.report.citations.len() == 1 { "" } else { "s" },
        outcome.sub_questions.len(),
        if outcome.sub_questions.len() == 1 { "" } else { "s" },
    ));

    Ok(ExitCode::SUCCESS)
}

/// A directory target gets the default `research_<query>` file name.
fn resolve_report_path(path: PathBuf, query: &str, config: &ResearchConfig) -> PathBuf {
    if path.is_dir() {
        path.join(export_filename(query, config.export.format))
    } else {
        path
    }
}

/// Build the text-generation client, if one is configured.
///
/// A client that cannot be created only disables synthesis, unless the
/// planner depends on it.
async fn connect_llm(
    config: &ResearchConfig,
    output: &Output,
) -> anyhow::Result<Option<Arc<dyn LLMClient>>> {
    let Some(llm_config) = &config.llm else {
        return Ok(None);
    };

    let api_key = llm_config
        .api_key_env()
        .and_then(|name| std::env::var(name).ok());

    let created = match llm_config.to_provider(api_key) {
        Ok(provider) => provider.create_client().await.map_err(anyhow::Error::from),
        Err(e) => Err(anyhow::Error::from(e)),
    };

    match created {
        Ok(client) => Ok(Some(Arc::from(client))),
        Err(e) if config.planner.strategy == PlannerStrategy::Llm => {
            Err(e.context("The llm planner needs a working text-generation client"))
        }
        Err(e) => {
            output.warning(&format!("Text generation disabled: {}", e));
            Ok(None)
        }
    }
}

fn cmd_config(path: &Path, validate_only: bool, output: &Output) -> anyhow::Result<ExitCode> {
    let config = if path.exists() {
        ResearchConfig::load(path)
    } else {
        output.info(&format!(
            "{} not found, showing built-in defaults",
            path.display()
        ));
        Ok(ResearchConfig::default())
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let warnings = match config.validate_with_warnings() {
        Ok(warnings) => warnings,
        Err(e) => {
            output.error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    if validate_only {
        output.success("Configuration is valid");
    } else {
        output.header("Configuration");
        output.kv("file", &path.display().to_string());
        output.kv("search chain", &config.build_chain()?.names().join(" -> "));
        output.kv(
            "text generation",
            &config
                .llm
                .as_ref()
                .map(|llm| format!("{} ({})", llm.kind(), llm.model()))
                .unwrap_or_else(|| "none".to_string()),
        );
        output.newline();
        println!("{}", config.to_toml()?);
    }

    for warning in &warnings {
        output.warning(&warning.to_string());
    }

    Ok(ExitCode::SUCCESS)
}
