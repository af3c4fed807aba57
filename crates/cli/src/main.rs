//! PaperMill CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — command-line arguments plus `papermill.toml`.
//! 2. **Wire observability** — configure `tracing-subscriber`; all `tracing`
//!    spans and structured events emitted by every crate in the workspace flow
//!    through this layer.
//! 3. **Construct infrastructure** — create the concrete providers
//!    (`ChatCompletionsProvider`, `SemanticScholarIndex`) and inject them into
//!    the orchestration core.
//! 4. **Execute one run** — drive [`scheduler::ResearchRun`] to completion and
//!    print the aggregate report as JSON on stdout.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use pipeline::{LanguageModel, ResearchQuery, ServiceName};
use scheduler::{KeywordProvider, ResearchRun};
use tokio::sync::watch;
use tracing::warn;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "papermill", version, about = "Multi-stage research paper analysis")]
struct Cli {
    /// The research question to investigate.
    question: String,

    /// Cap on papers retrieved from the index for this run.
    #[arg(long)]
    max_results: Option<usize>,

    /// Number of concurrently analysed papers.
    #[arg(long)]
    max_workers: Option<usize>,

    /// Path to the configuration file (defaults to ./papermill.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("papermill error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(max_workers) = cli.max_workers {
        config.run.max_workers = max_workers;
    }

    let query = ResearchQuery::new(cli.question, cli.max_results)?;

    let openai_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY must be set in the environment")?;
    let openai: Arc<dyn LanguageModel> = Arc::new(llm::ChatCompletionsProvider::openai(
        openai_key,
        &config.providers.openai_model,
    )?);

    let together: Option<Arc<dyn LanguageModel>> = match std::env::var("TOGETHER_API_KEY") {
        Ok(key) => Some(Arc::new(llm::ChatCompletionsProvider::together(
            key,
            &config.providers.together_model,
        )?)),
        Err(_) => {
            warn!("TOGETHER_API_KEY not set; all stages will run on the OpenAI provider");
            None
        }
    };
    let reasoning = together.clone().unwrap_or_else(|| Arc::clone(&openai));

    let analyst = Arc::new(llm::LlmAnalyst::new(Arc::clone(&openai), reasoning));
    let index = Arc::new(index::SemanticScholarIndex::new()?);

    let mut keyword_providers = vec![KeywordProvider {
        service: service("openai")?,
        source: Arc::new(llm::LlmKeywordSource::new(Arc::clone(&openai))),
    }];
    if let Some(together) = together {
        keyword_providers.push(KeywordProvider {
            service: service("together")?,
            source: Arc::new(llm::LlmKeywordSource::new(together)),
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing papers already in flight");
            let _ = shutdown_tx.send(true);
        }
    });

    let run = ResearchRun::new(&config.run, analyst, index, keyword_providers)?
        .with_shutdown(shutdown_rx);
    let report = run.execute(&query).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn service(name: &str) -> anyhow::Result<ServiceName> {
    ServiceName::new(name).context("service name must not be empty")
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}
