//! `forge-validate-cli` — runs only the Validator + Review pipeline
//! against an already-checked-out workspace directory, for
//! local iteration without invoking the full correction loop. Grounded on
//! running validation on CI without spinning up a full engine run
//! alongside its main one for an operational subset of the system.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use forge_core::config::ValidationConfig;
use forge_validate::{review, Validator};

#[derive(Parser)]
#[command(name = "forge-validate-cli", about = "Run type-check/lint/test/review against a workspace directory")]
struct Cli {
    /// Workspace directory to validate.
    workspace: PathBuf,

    /// Files (workspace-relative) to restrict lint and review to. Defaults
    /// to every tracked file changed relative to `base_branch` when a git
    /// repository is present, otherwise the full file list must be given.
    #[arg(short, long)]
    files: Vec<String>,

    /// Include the test run.
    #[arg(long, default_value_t = false)]
    tests: bool,

    /// Skip the type-check step.
    #[arg(long, default_value_t = false)]
    no_build: bool,

    /// Per-step timeout in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    anyhow::ensure!(
        cli.workspace.is_dir(),
        "{} is not a directory",
        cli.workspace.display()
    );

    let config = ValidationConfig {
        build_timeout_ms: cli.timeout_ms,
        run_build: !cli.no_build,
        enable_tests: cli.tests,
        enable_auto_fix: true,
        enable_atomic_edits: true,
        enable_structured_errors: true,
        enable_repository_index: false,
        enable_planning_preview: false,
    };

    let validator = Validator::new(Duration::from_millis(cli.timeout_ms));
    let validation = validator
        .validate(&cli.workspace, &cli.files, &config, false)
        .await
        .context("running the validation pipeline")?;

    let review_result = review(&cli.workspace, &cli.files).context("running the review pass")?;

    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "validation": validation,
        "review": review_result,
    }))?);

    if !validation.success || !review_result.passed() {
        std::process::exit(1);
    }
    Ok(())
}
