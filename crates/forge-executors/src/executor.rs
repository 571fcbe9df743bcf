//! The `Executor` capability: a single trait with three
//! concrete implementations standing in for three LLM
//! back-end shapes — an in-repo prompt-only planner/executor, a
//! tool-using autonomous agent, and a subprocess CLI agent. The
//! Correction Controller in `forge-engine` is written against this trait
//! and is agnostic to which variant backs it.

use std::collections::HashMap;

use forge_core::error::Result;
use forge_core::ids::TaskId;
use forge_core::types::{Plan, TokenUsage, ValidationResult};
use forge_discovery::DiscoveryOutput;
use forge_prompt::ExecutionOutput;

pub struct PlanContext<'a> {
    pub task_id: &'a TaskId,
    pub task: &'a str,
    pub expected_output: &'a str,
    pub discovery: &'a DiscoveryOutput,
    pub allowed_write_dirs: &'a [String],
    pub research_context: Option<&'a str>,
    pub goal_context: Option<&'a str>,
}

pub struct ReplanContext<'a> {
    pub task_id: &'a TaskId,
    pub task: &'a str,
    pub expected_output: &'a str,
    pub failed_files: &'a [String],
    pub discovery: &'a DiscoveryOutput,
}

pub struct ExecuteContext<'a> {
    pub task_id: &'a TaskId,
    pub task: &'a str,
    pub plan: &'a Plan,
    pub file_bodies: &'a HashMap<String, String>,
    pub import_aliases: &'a HashMap<String, String>,
    pub preexisting_lint_errors: Option<&'a str>,
    pub prior_attempt_summaries: &'a [String],
    pub allowed_write_dirs: &'a [String],
}

pub struct CorrectContext<'a> {
    pub task_id: &'a TaskId,
    pub previous_output: &'a str,
    pub validation: &'a ValidationResult,
    pub type_snippets: &'a [String],
    pub offending_file_bodies: &'a HashMap<String, String>,
    pub escalate: bool,
}

/// Uniform capability every back-end variant provides: plan, execute,
/// correct, replan, each reporting the tokens it spent alongside its
/// parsed output so the controller can log and budget consistently no
/// matter which variant is active.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    async fn plan(&self, ctx: PlanContext<'_>) -> Result<(Plan, TokenUsage)>;
    async fn replan(&self, ctx: ReplanContext<'_>) -> Result<(Plan, TokenUsage)>;
    async fn execute(&self, ctx: ExecuteContext<'_>) -> Result<(ExecutionOutput, TokenUsage)>;
    async fn correct(&self, ctx: CorrectContext<'_>) -> Result<(ExecutionOutput, TokenUsage)>;
}
