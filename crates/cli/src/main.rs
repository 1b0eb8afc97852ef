use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tot_cache::SemanticCache;
use tot_config::{RunConfig, Task};
use tot_llm::{Gateway, HttpBackend, MockBackend};
use tot_prompt::PromptTemplates;
use tot_registry::{CancelOutcome, ModelTags, RunRegistry};

/// Default Ollama-compatible endpoints, overridable by `TOT_CHAT_URL` /
/// `TOT_EMBED_URL` / `TOT_API_KEY`, mirroring the teacher's
/// `ollama_base_url` default-then-env-override convention
/// (`crates/config`).
const DEFAULT_CHAT_URL: &str = "http://localhost:11434/v1/chat/completions";
const DEFAULT_EMBED_URL: &str = "http://localhost:11434/v1/embeddings";

#[derive(Debug, Parser)]
#[command(name = "tot", version, about = "Tree-of-Thoughts reasoning orchestrator")]
struct Cli {
    /// Skip the network backend and reason against a scripted mock Gateway.
    /// Useful for trying the CLI without a running model.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a run and block until it reaches a terminal status, printing
    /// the final trace.
    Run {
        instruction: String,
        #[arg(long)]
        constraints: Option<String>,
        #[arg(long)]
        config: Option<String>,
        /// Cancel the run this many milliseconds after starting it, to
        /// demonstrate the cancel path in a single process.
        #[arg(long)]
        cancel_after_ms: Option<u64>,
    },
    /// Print `{status, metrics}` for a run known to this process.
    Status { run_id: String },
    /// Print the full node trace for a run known to this process.
    Trace { run_id: String },
    /// Request cancellation of a run known to this process.
    Cancel { run_id: String },
    /// List every run known to this process.
    List,
}

fn build_registry(mock: bool) -> Result<(RunRegistry, Option<Arc<MockBackend>>)> {
    let models = ModelTags { chat: "chat".into(), embed: "embed".into() };
    let templates = PromptTemplates::default();

    if mock {
        let backend = Arc::new(MockBackend::new(16));
        let gateway = Gateway::new(backend.clone());
        let cache = Arc::new(SemanticCache::new(gateway.clone(), "embed", 0.95, 256));
        return Ok((RunRegistry::new(gateway, cache, templates, models), Some(backend)));
    }

    let chat_url = std::env::var("TOT_CHAT_URL").unwrap_or_else(|_| DEFAULT_CHAT_URL.to_string());
    let embed_url = std::env::var("TOT_EMBED_URL").unwrap_or_else(|_| DEFAULT_EMBED_URL.to_string());
    let mut backend = HttpBackend::new(chat_url, embed_url);
    if let Ok(key) = std::env::var("TOT_API_KEY") {
        backend = backend.with_api_key(key);
    }
    let gateway = Gateway::new(Arc::new(backend));
    let cache = Arc::new(SemanticCache::new(gateway.clone(), "embed", 0.95, 256));
    Ok((RunRegistry::new(gateway, cache, templates, models), None))
}

fn load_config(path: &Option<String>) -> Result<RunConfig> {
    match path {
        Some(path) => tot_config::RunConfig::load_from(path).context("loading run config"),
        None => Ok(RunConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let (registry, _backend) = build_registry(cli.mock)?;

    match cli.command {
        Commands::Run { instruction, constraints, config, cancel_after_ms } => {
            let mut task = Task::new(instruction);
            if let Some(constraints) = constraints {
                task = task.with_constraints(constraints);
            }
            let config = load_config(&config)?;

            let run_id = registry.start(task, config).await?;
            println!("run_id: {run_id}");

            if let Some(delay) = cancel_after_ms {
                let registry = &registry;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                match registry.cancel(&run_id).await? {
                    CancelOutcome::Cancelled => println!("cancel requested"),
                    CancelOutcome::AlreadyTerminal => println!("run already finished, cancel had no effect"),
                }
            }

            loop {
                let summary = registry.status(&run_id).await?;
                if summary.status.is_terminal() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }

            let snapshot = registry.trace(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Status { run_id } => {
            let summary = registry.status(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Trace { run_id } => {
            let snapshot = registry.trace(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Cancel { run_id } => match registry.cancel(&run_id).await? {
            CancelOutcome::Cancelled => println!("cancel requested"),
            CancelOutcome::AlreadyTerminal => println!("already terminal"),
        },
        Commands::List => {
            let summaries = registry.list().await;
            if summaries.is_empty() {
                bail!("no runs known to this process; `status`/`trace`/`cancel`/`list` only see runs started earlier in the same invocation");
            }
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}
