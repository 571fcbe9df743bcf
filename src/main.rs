//! `forge` — reads a `Delegation`+`Project` pair and runs the correction
//! controller to completion through the engine driver, printing the
//! resulting `ExecutionResult` as JSON. A `clap` CLI, `tracing-subscriber`
//! wired up first thing in `main`, and a single `anyhow::Result<()>` return
//! that aggregates `ForgeError` with top-level I/O and config failures.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use forge_audit::{AuditTrail, BudgetAudit, JsonLinesSink};
use forge_core::config::ForgeConfig;
use forge_core::types::{Delegation, Project};
use forge_executors::{AgentExecutor, Executor, PromptExecutor};
use forge_git::GitManager;
use forge_llm::{AnthropicProvider, LlmDriver, LlmProvider};
use forge_tools::ToolRegistry;
use forge_validate::Validator;
use forge_workspace::WorkspaceManager;

/// One JSON document on stdin or at `--input`, combining the two records
/// the engine needs: `{"delegation": Delegation, "project": Project}`.
#[derive(serde::Deserialize)]
struct EngineInput {
    delegation: Delegation,
    project: Project,
}

#[derive(Parser)]
#[command(name = "forge", about = "FORGE code-modification engine")]
struct Cli {
    /// Path to a JSON file with `{"delegation": ..., "project": ...}`.
    /// Reads stdin when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to a `forge.toml` config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip task workspace cleanup on completion, for local debugging.
    #[arg(long, default_value_t = false)]
    keep_workspace: bool,

    /// Attempt to push the result branch to the project's remote.
    #[arg(long, default_value_t = false)]
    push: bool,

    /// Use the tool-using autonomous agent executor instead of the
    /// default prompt-only planner/executor.
    #[arg(long, default_value_t = false)]
    agent: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}

fn read_input(path: Option<&PathBuf>) -> Result<EngineInput> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading delegation input from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading delegation input from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("parsing delegation input as JSON")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = ForgeConfig::load(cli.config.as_deref()).context("loading forge.toml")?;
    if cli.keep_workspace {
        config.correction.keep_workspace = true;
    }
    if cli.push {
        config.storage.push_enabled = true;
    }

    let input = read_input(cli.input.as_ref())?;

    let budget = Arc::new(BudgetAudit::new(
        config.budget.per_task_token_limit,
        config.budget.monthly_token_limit,
    ));
    // Default `RecordSink`: one JSON-Lines file per §6 record shape under
    // `<workspaces_root>/.records`. A caller with a real database wires its
    // own `RecordSink` and builds `AuditTrail::with_sink` instead.
    let records_root = config.storage.workspaces_root.join(".records");
    let sink = Arc::new(
        JsonLinesSink::open(&records_root).context("opening the default record sink")?,
    );
    let trail = Arc::new(AuditTrail::with_sink(sink));

    let api_key = std::env::var("ANTHROPIC_API_KEY").context(
        "ANTHROPIC_API_KEY must be set; the engine consumes only the LlmClient capability, \
         never provider configuration beyond the key itself",
    )?;
    let model = std::env::var("FORGE_LLM_MODEL").unwrap_or_else(|_| "claude-sonnet-4-5".to_string());
    let provider: Arc<dyn LlmProvider> = Arc::new(AnthropicProvider::new(api_key));
    let llm_driver = Arc::new(LlmDriver::new(provider, model, budget.clone(), trail.clone()));

    let executor: Arc<dyn Executor> = if cli.agent {
        Arc::new(AgentExecutor::new(llm_driver, Arc::new(ToolRegistry::new())))
    } else {
        Arc::new(PromptExecutor::new(llm_driver))
    };

    let git_timeout = std::time::Duration::from_secs(60);
    let git = Arc::new(GitManager::new(git_timeout));
    let workspace = Arc::new(WorkspaceManager::new(
        config.storage.workspaces_root.clone(),
        GitManager::new(git_timeout),
    ));
    let validator = Arc::new(Validator::new(std::time::Duration::from_millis(
        config.validation.build_timeout_ms,
    )));

    let driver = forge_engine::EngineDriver::new(workspace, git, executor, validator, budget, trail, config);

    let result = driver
        .execute(input.delegation, input.project)
        .await
        .context("running the correction controller")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
